//! Rule checks for student submissions.
//!
//! `analyze` parses the source and picks a strategy: the `AstChecker` when
//! the parse succeeds, the `TextualChecker` otherwise. Both return the same
//! `Findings` shape and neither can fail.

mod ast;
mod fallback;
mod methods;
mod naming;
mod operators;
mod patterns;
mod scope;
mod structures;
mod types;

pub use ast::AstChecker;
pub use fallback::{method_regex, TextualChecker};
pub use methods::{match_methods, param_matches, MethodMatch};
pub use naming::check_naming;
pub use operators::{blank_non_code, check_operators};
pub use patterns::check_custom_patterns;
pub use scope::check_variable_scope;
pub use structures::check_control_structures;
pub use types::{
    ControlStructureFindings, Details, DisallowedOperator, Findings, FoundSignature,
    MissingMethod, MissingPattern, NamingError, NamingFindings, ScopeError, ScopeFindings,
    Strategy, SyntaxError, WrongMethodName,
};

use crate::parser;
use crate::rules::RuleSpecification;

/// A strategy that evaluates a rule specification against one submission.
pub trait RuleChecker {
    fn strategy(&self) -> Strategy;

    /// Evaluate every rule category. Failures become findings.
    fn check(&self, spec: &RuleSpecification) -> Findings;
}

/// Check a submission against a rule specification.
pub fn analyze(source: &str, spec: &RuleSpecification) -> Findings {
    match parser::parse(source) {
        Ok(parsed) => AstChecker::new(&parsed).check(spec),
        Err(failure) => {
            tracing::info!(%failure, "source does not parse, using textual checks");
            TextualChecker::new(source, failure).check(spec)
        }
    }
}
