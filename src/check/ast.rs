//! Rule checks over a parsed syntax tree.

use crate::parser::ParsedSource;
use crate::rules::RuleSpecification;

use super::methods::match_methods;
use super::naming::check_naming;
use super::operators::check_operators;
use super::patterns::check_custom_patterns;
use super::scope::check_variable_scope;
use super::structures::check_control_structures;
use super::{Findings, RuleChecker, Strategy};

/// Full checker for sources that parsed cleanly.
pub struct AstChecker<'a> {
    parsed: &'a ParsedSource,
}

impl<'a> AstChecker<'a> {
    pub fn new(parsed: &'a ParsedSource) -> Self {
        Self { parsed }
    }
}

impl RuleChecker for AstChecker<'_> {
    fn strategy(&self) -> Strategy {
        Strategy::Ast
    }

    fn check(&self, spec: &RuleSpecification) -> Findings {
        let rules = &spec.rules;
        let mut findings = Findings::new();
        findings.details.strategy = self.strategy();

        // Methods
        let methods = match_methods(&self.parsed.declarations, &rules.required_methods);
        for (name, signature) in methods.found {
            findings.add_found_method(&name, signature);
        }
        for missing in methods.missing {
            findings.add_missing_method(missing);
        }
        for wrong in &methods.wrong_names {
            findings.add_suggestion(format!(
                "Method '{}' has the expected signature; did you mean '{}'?",
                wrong.found_name, wrong.expected_name
            ));
        }
        findings.details.wrong_method_names = methods.wrong_names;

        // Patterns
        findings.details.missing_patterns =
            check_custom_patterns(&self.parsed.source, &rules.custom_patterns);

        // Control structures
        if !rules.required_control_structures.is_empty() {
            match check_control_structures(self.parsed, &rules.required_control_structures) {
                Ok(structures) => {
                    if !structures.missing.is_empty() {
                        findings.add_suggestion(format!(
                            "Required control structures are missing: {}",
                            structures.missing.join(", ")
                        ));
                    }
                    findings.details.control_structures = Some(structures);
                }
                Err(e) => tracing::warn!(error = %e, "control structure check failed"),
            }
        }

        // Variable scope
        if rules.check_variable_scope {
            match check_variable_scope(self.parsed) {
                Ok(scopes) => {
                    if !scopes.errors.is_empty() {
                        findings.add_suggestion(
                            "Check variable scope: some variables are used without being declared.",
                        );
                    }
                    findings.details.variable_scopes = Some(scopes);
                }
                Err(e) => tracing::warn!(error = %e, "variable scope check failed"),
            }
        }

        // Naming
        if !rules.check_naming_conventions.is_empty() {
            match check_naming(self.parsed, &rules.check_naming_conventions) {
                Ok(naming) => findings.details.naming_conventions = Some(naming),
                Err(e) => tracing::warn!(error = %e, "naming check failed"),
            }
        }

        // Operators
        if let Some(allowed) = spec.allowed_operators() {
            findings.details.disallowed_operators =
                check_operators(&self.parsed.source, allowed);
        }

        findings
    }
}
