//! Core types for rule-check findings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::parser::SyntaxFailure;
use crate::rules::RequiredMethod;

/// Which checker produced the findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Full checks over the syntax tree.
    #[default]
    Ast,
    /// Regex-only checks after a syntax failure.
    Textual,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Ast => write!(f, "ast"),
            Strategy::Textual => write!(f, "textual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl From<SyntaxFailure> for SyntaxError {
    fn from(f: SyntaxFailure) -> Self {
        Self {
            line: f.line,
            message: f.message,
        }
    }
}

/// A required method that was not found with the expected signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingMethod {
    pub name: String,
    pub expected_params: Vec<String>,
    pub expected_return: String,
}

impl From<&RequiredMethod> for MissingMethod {
    fn from(m: &RequiredMethod) -> Self {
        Self {
            name: m.name.clone(),
            expected_params: m.params.clone(),
            expected_return: m.return_type.clone(),
        }
    }
}

/// Signature of a method that satisfied a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundSignature {
    pub params: Vec<String>,
    #[serde(rename = "return")]
    pub return_type: String,
}

/// A method with the right shape under another name (a likely typo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongMethodName {
    pub found_name: String,
    pub expected_name: String,
    pub return_type: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPattern {
    pub description: String,
    pub error_message: String,
    /// Text matched by a negative pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisallowedOperator {
    pub operator: String,
    /// Character offset in the source.
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlStructureFindings {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingError {
    /// "method", "variable", "parameter", "class" or "constant"
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub expected: String,
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingFindings {
    pub errors: Vec<NamingError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeError {
    pub method: String,
    pub undeclared_variables: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFindings {
    pub errors: Vec<ScopeError>,
}

/// Per-category details of an analysis.
///
/// Optional categories are `None` when the rule specification does not ask
/// for them or the checker could not evaluate them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Details {
    pub strategy: Strategy,
    pub found_methods: BTreeMap<String, Vec<FoundSignature>>,
    pub wrong_method_names: Vec<WrongMethodName>,
    pub missing_patterns: Vec<MissingPattern>,
    pub disallowed_operators: Vec<DisallowedOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_structures: Option<ControlStructureFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming_conventions: Option<NamingFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_scopes: Option<ScopeFindings>,
    pub suggestions: Vec<String>,
}

/// Result of checking one submission against a rule specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Findings {
    pub is_valid: bool,
    pub syntax_errors: Vec<SyntaxError>,
    pub missing_methods: Vec<MissingMethod>,
    pub details: Details,
}

impl Default for Findings {
    fn default() -> Self {
        Self {
            is_valid: true,
            syntax_errors: Vec::new(),
            missing_methods: Vec::new(),
            details: Details::default(),
        }
    }
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a missing method unless one with the same name is already listed.
    pub fn add_missing_method(&mut self, method: MissingMethod) {
        if !self.missing_methods.iter().any(|m| m.name == method.name) {
            self.missing_methods.push(method);
        }
    }

    /// Record a matched method under its name.
    pub fn add_found_method(&mut self, name: &str, signature: FoundSignature) {
        self.details
            .found_methods
            .entry(name.to_string())
            .or_default()
            .push(signature);
    }

    pub fn add_suggestion(&mut self, suggestion: impl Into<String>) {
        self.details.suggestions.push(suggestion.into());
    }

    pub fn syntax_ok(&self) -> bool {
        self.is_valid && self.syntax_errors.is_empty()
    }

    pub fn methods_ok(&self) -> bool {
        self.missing_methods.is_empty()
    }

    pub fn patterns_ok(&self) -> bool {
        self.details.missing_patterns.is_empty()
    }

    pub fn operators_ok(&self) -> bool {
        self.details.disallowed_operators.is_empty()
    }

    pub fn control_structures_ok(&self) -> bool {
        self.details
            .control_structures
            .as_ref()
            .map(|c| c.missing.is_empty())
            .unwrap_or(true)
    }

    pub fn naming_ok(&self) -> bool {
        self.details
            .naming_conventions
            .as_ref()
            .map(|n| n.errors.is_empty())
            .unwrap_or(true)
    }

    pub fn scope_ok(&self) -> bool {
        self.details
            .variable_scopes
            .as_ref()
            .map(|s| s.errors.is_empty())
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_methods_are_deduplicated() {
        let mut findings = Findings::new();
        let m = MissingMethod {
            name: "f".to_string(),
            expected_params: vec![],
            expected_return: "void".to_string(),
        };
        findings.add_missing_method(m.clone());
        findings.add_missing_method(m);
        assert_eq!(findings.missing_methods.len(), 1);
    }

    #[test]
    fn test_absent_categories_pass() {
        let findings = Findings::new();
        assert!(findings.control_structures_ok());
        assert!(findings.naming_ok());
        assert!(findings.scope_ok());
    }

    #[test]
    fn test_json_field_names() {
        let mut findings = Findings::new();
        findings.add_found_method(
            "estMajeur",
            FoundSignature {
                params: vec!["int".to_string()],
                return_type: "boolean".to_string(),
            },
        );
        let json = serde_json::to_value(&findings).unwrap();
        assert_eq!(json["is_valid"], true);
        assert_eq!(
            json["details"]["found_methods"]["estMajeur"][0]["return"],
            "boolean"
        );
        assert_eq!(json["details"]["strategy"], "ast");
        assert!(json["details"].get("control_structures").is_none());
    }
}
