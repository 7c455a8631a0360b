//! Required control structure detection.

use std::collections::BTreeSet;

use crate::parser::ParsedSource;
use crate::rules::ControlStructure;

use super::ControlStructureFindings;

/// Tree-sitter query matching every statement kind that maps to a
/// `ControlStructure`.
const CONTROL_QUERY: &str = r#"
(if_statement) @if
(for_statement) @for
(enhanced_for_statement) @for
(while_statement) @while
(do_statement) @do
(switch_expression) @switch
(try_statement) @try
(try_with_resources_statement) @try
"#;

/// Report which required control structures appear in the tree.
pub fn check_control_structures(
    parsed: &ParsedSource,
    required: &[ControlStructure],
) -> anyhow::Result<ControlStructureFindings> {
    let present: BTreeSet<String> = parsed
        .captures(CONTROL_QUERY)?
        .into_iter()
        .map(|(name, _)| name)
        .collect();

    let mut findings = ControlStructureFindings::default();
    for structure in required {
        let name = structure.as_str().to_string();
        let bucket = if present.contains(&name) {
            &mut findings.found
        } else {
            &mut findings.missing
        };
        if !bucket.contains(&name) {
            bucket.push(name);
        }
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_found_and_missing() {
        let parsed = parse(
            r#"
class Loop {
    int sum(int[] values) {
        int total = 0;
        for (int v : values) {
            if (v > 0) total += v;
        }
        return total;
    }
}
"#,
        )
        .unwrap();
        let findings = check_control_structures(
            &parsed,
            &[
                ControlStructure::For,
                ControlStructure::If,
                ControlStructure::While,
            ],
        )
        .unwrap();
        assert_eq!(findings.found, vec!["for", "if"]);
        assert_eq!(findings.missing, vec!["while"]);
    }

    #[test]
    fn test_switch_and_try() {
        let parsed = parse(
            r#"
class Menu {
    void run(int choice) {
        try {
            switch (choice) {
                case 1: break;
                default: break;
            }
        } catch (Exception e) {
        }
    }
}
"#,
        )
        .unwrap();
        let findings = check_control_structures(
            &parsed,
            &[ControlStructure::Switch, ControlStructure::Try, ControlStructure::Do],
        )
        .unwrap();
        assert_eq!(findings.found, vec!["switch", "try"]);
        assert_eq!(findings.missing, vec!["do"]);
    }
}
