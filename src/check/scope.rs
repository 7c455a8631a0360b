//! Variable scope check: identifiers used in a method that are declared
//! neither in that method nor as a field in the file.

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::parser::ParsedSource;

use super::{ScopeError, ScopeFindings};

const METHOD_QUERY: &str = "(method_declaration) @method";

/// Parents under which a bare identifier is a variable read or write.
const EXPRESSION_PARENTS: &[&str] = &[
    "argument_list",
    "array_access",
    "array_initializer",
    "assignment_expression",
    "binary_expression",
    "cast_expression",
    "dimensions_expr",
    "expression_statement",
    "parenthesized_expression",
    "return_statement",
    "ternary_expression",
    "throw_statement",
    "unary_expression",
    "update_expression",
];

/// Report undeclared variable references per method.
pub fn check_variable_scope(parsed: &ParsedSource) -> anyhow::Result<ScopeFindings> {
    let root = parsed.tree.root_node();

    let mut globals = BTreeSet::new();
    visit(root, &mut |node| collect_field(parsed, node, &mut globals));

    let mut findings = ScopeFindings::default();
    for (_, method) in parsed.captures(METHOD_QUERY)? {
        let method_name = method
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n))
            .unwrap_or("");

        let mut locals = BTreeSet::new();
        let mut used = BTreeSet::new();
        visit(method, &mut |node| {
            collect_local(parsed, node, &mut locals);
            if is_reference(node) {
                used.insert(parsed.node_text(node).to_string());
            }
        });

        let undeclared: Vec<String> = used
            .into_iter()
            .filter(|name| !locals.contains(name) && !globals.contains(name))
            .collect();
        if !undeclared.is_empty() {
            tracing::debug!(method = method_name, ?undeclared, "undeclared variables");
            findings.errors.push(ScopeError {
                method: method_name.to_string(),
                message: format!(
                    "variables used but not declared in method {}: {}",
                    method_name,
                    undeclared.join(", ")
                ),
                undeclared_variables: undeclared,
            });
        }
    }

    Ok(findings)
}

fn visit<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    f(node);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(child, f);
    }
}

fn collect_field(parsed: &ParsedSource, node: Node, globals: &mut BTreeSet<String>) {
    match node.kind() {
        "field_declaration" | "constant_declaration" => {
            let mut cursor = node.walk();
            for declarator in node.children_by_field_name("declarator", &mut cursor) {
                if let Some(name) = declarator.child_by_field_name("name") {
                    globals.insert(parsed.node_text(name).to_string());
                }
            }
        }
        "enum_constant" => {
            if let Some(name) = node.child_by_field_name("name") {
                globals.insert(parsed.node_text(name).to_string());
            }
        }
        _ => {}
    }
}

fn collect_local(parsed: &ParsedSource, node: Node, locals: &mut BTreeSet<String>) {
    match node.kind() {
        "formal_parameter"
        | "catch_formal_parameter"
        | "variable_declarator"
        | "enhanced_for_statement"
        | "resource"
        | "instanceof_expression" => {
            if let Some(name) = node.child_by_field_name("name") {
                locals.insert(parsed.node_text(name).to_string());
            }
        }
        "lambda_expression" => {
            if let Some(params) = node.child_by_field_name("parameters") {
                if params.kind() == "identifier" {
                    locals.insert(parsed.node_text(params).to_string());
                } else if params.kind() == "inferred_parameters" {
                    let mut cursor = params.walk();
                    for p in params.named_children(&mut cursor) {
                        locals.insert(parsed.node_text(p).to_string());
                    }
                }
            }
        }
        _ => {}
    }
}

/// An unqualified identifier in expression position.
fn is_reference(node: Node) -> bool {
    if node.kind() != "identifier" {
        return false;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_field = |field: &str| parent.child_by_field_name(field) == Some(node);

    match parent.kind() {
        k if EXPRESSION_PARENTS.contains(&k) => true,
        "variable_declarator" => is_field("value"),
        "enhanced_for_statement" => is_field("value"),
        "instanceof_expression" => is_field("left"),
        "lambda_expression" => is_field("body"),
        "for_statement" => is_field("condition"),
        _ => false,
    }
}
