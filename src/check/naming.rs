//! Identifier naming convention checks.

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use crate::parser::ParsedSource;
use crate::rules::NamingConvention;

use super::{NamingError, NamingFindings};

lazy_static! {
    static ref CAMEL_CASE: Regex = Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap();
    static ref PASCAL_CASE: Regex = Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap();
    static ref UPPER_CASE: Regex = Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap();
}

/// Tree-sitter query for named declarations.
///
/// Captures:
/// - `method`, `variable`, `parameter`: checked against camelCase
/// - `class`: class, interface and enum names, checked against PascalCase
/// - `field`, `constant`: field declarations, whose `static final`
///   declarators are checked against UPPER_CASE
const NAMING_QUERY: &str = r#"
(method_declaration name: (identifier) @method)
(local_variable_declaration declarator: (variable_declarator name: (identifier) @variable))
(formal_parameter name: (identifier) @parameter)
(class_declaration name: (identifier) @class)
(interface_declaration name: (identifier) @class)
(enum_declaration name: (identifier) @class)
(field_declaration) @field
(constant_declaration) @constant
"#;

/// Check declared names against the requested conventions.
pub fn check_naming(
    parsed: &ParsedSource,
    conventions: &[NamingConvention],
) -> anyhow::Result<NamingFindings> {
    let mut findings = NamingFindings::default();
    if conventions.is_empty() {
        return Ok(findings);
    }

    for (capture, node) in parsed.captures(NAMING_QUERY)? {
        match capture.as_str() {
            "method" | "variable" | "parameter" => {
                if conventions.contains(&NamingConvention::CamelCase) {
                    check_name(parsed, node, &capture, NamingConvention::CamelCase, &mut findings);
                }
            }
            "class" => {
                if conventions.contains(&NamingConvention::PascalCase) {
                    check_name(parsed, node, "class", NamingConvention::PascalCase, &mut findings);
                }
            }
            "field" | "constant" => {
                if !conventions.contains(&NamingConvention::UpperCase) {
                    continue;
                }
                if capture == "field" && !is_static_final(parsed, node) {
                    continue;
                }
                let mut cursor = node.walk();
                for declarator in node.children_by_field_name("declarator", &mut cursor) {
                    if let Some(name) = declarator.child_by_field_name("name") {
                        check_name(parsed, name, "constant", NamingConvention::UpperCase, &mut findings);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(findings)
}

fn check_name(
    parsed: &ParsedSource,
    node: Node,
    kind: &str,
    convention: NamingConvention,
    findings: &mut NamingFindings,
) {
    let name = parsed.node_text(node);
    let regex: &Regex = match convention {
        NamingConvention::CamelCase => &CAMEL_CASE,
        NamingConvention::PascalCase => &PASCAL_CASE,
        NamingConvention::UpperCase => &UPPER_CASE,
    };
    if regex.is_match(name) {
        return;
    }
    findings.errors.push(NamingError {
        kind: kind.to_string(),
        name: name.to_string(),
        expected: convention.as_str().to_string(),
        line: node.start_position().row + 1,
        message: format!("{} name '{}' does not follow {}", kind, name, convention),
    });
}

fn is_static_final(parsed: &ParsedSource, field: Node) -> bool {
    let mut cursor = field.walk();
    let modifiers = field
        .children(&mut cursor)
        .find(|n| n.kind() == "modifiers");
    match modifiers {
        Some(m) => {
            let words: Vec<&str> = parsed.node_text(m).split_whitespace().collect();
            words.contains(&"static") && words.contains(&"final")
        }
        None => false,
    }
}
