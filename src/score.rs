//! Grading heuristic for gradecheck.
//!
//! Reduces findings to a score: seven equally weighted pass/fail checks,
//! scaled to the exercise's max points and rounded to one decimal.

use serde::{Deserialize, Serialize};

use crate::check::Findings;

/// Check names, in grading order.
pub mod checks {
    pub const SYNTAX: &str = "syntax";
    pub const METHODS: &str = "methods";
    pub const PATTERNS: &str = "patterns";
    pub const OPERATORS: &str = "operators";
    pub const CONTROL_STRUCTURES: &str = "control_structures";
    pub const NAMING: &str = "naming";
    pub const SCOPE: &str = "scope";
}

/// Number of checks every submission is graded on.
pub const TOTAL_CHECKS: usize = 7;

/// Outcome of one grading check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

/// The graded result for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    /// Score rounded to one decimal, between 0 and `max_points`
    pub score: f64,
    pub max_points: f64,
    pub passed_checks: usize,
    pub total_checks: usize,
    /// Per-check outcomes, in grading order
    pub checks: Vec<CheckResult>,
}

impl GradeReport {
    /// Whether every check passed.
    pub fn all_passed(&self) -> bool {
        self.passed_checks == self.total_checks
    }

    /// Whether the score reaches `min_score`, or all checks pass when no
    /// minimum is given.
    pub fn passes(&self, min_score: Option<f64>) -> bool {
        match min_score {
            Some(min) => self.score >= min,
            None => self.all_passed(),
        }
    }

    /// Names of the failed checks.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Grade findings against the exercise's max points.
pub fn grade(findings: &Findings, max_points: f64) -> GradeReport {
    let checks = vec![
        (checks::SYNTAX, findings.syntax_ok()),
        (checks::METHODS, findings.methods_ok()),
        (checks::PATTERNS, findings.patterns_ok()),
        (checks::OPERATORS, findings.operators_ok()),
        (checks::CONTROL_STRUCTURES, findings.control_structures_ok()),
        (checks::NAMING, findings.naming_ok()),
        (checks::SCOPE, findings.scope_ok()),
    ];
    let passed_checks = checks.iter().filter(|(_, ok)| *ok).count();

    GradeReport {
        score: round1(passed_checks as f64 / TOTAL_CHECKS as f64 * max_points),
        max_points,
        passed_checks,
        total_checks: TOTAL_CHECKS,
        checks: checks
            .into_iter()
            .map(|(name, passed)| CheckResult {
                name: name.to_string(),
                passed,
            })
            .collect(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{
        ControlStructureFindings, DisallowedOperator, MissingMethod, NamingError, NamingFindings,
    };

    #[test]
    fn test_clean_findings_get_full_marks() {
        let report = grade(&Findings::new(), 10.0);
        assert_eq!(report.score, 10.0);
        assert_eq!(report.passed_checks, 7);
        assert!(report.all_passed());
        assert!(report.failed_checks().is_empty());
    }

    #[test]
    fn test_each_failure_costs_a_seventh() {
        let mut findings = Findings::new();
        findings.is_valid = false;
        findings.add_missing_method(MissingMethod {
            name: "estMajeur".to_string(),
            expected_params: vec!["int".to_string()],
            expected_return: "boolean".to_string(),
        });
        let report = grade(&findings, 10.0);
        // 5/7 * 10 = 7.142...
        assert_eq!(report.score, 7.1);
        assert_eq!(report.failed_checks(), vec!["syntax", "methods"]);
    }

    #[test]
    fn test_optional_categories() {
        let mut findings = Findings::new();
        findings.details.control_structures = Some(ControlStructureFindings {
            found: vec![],
            missing: vec!["for".to_string()],
        });
        findings.details.naming_conventions = Some(NamingFindings {
            errors: vec![NamingError {
                kind: "method".to_string(),
                name: "Foo".to_string(),
                expected: "camelCase".to_string(),
                line: 1,
                message: String::new(),
            }],
        });
        findings.details.disallowed_operators.push(DisallowedOperator {
            operator: "*".to_string(),
            position: 0,
            message: String::new(),
        });
        let report = grade(&findings, 7.0);
        assert_eq!(report.passed_checks, 4);
        assert_eq!(report.score, 4.0);
    }

    #[test]
    fn test_adding_a_passing_check_never_lowers_the_score() {
        let mut findings = Findings::new();
        findings.is_valid = false;
        findings.details.disallowed_operators.push(DisallowedOperator {
            operator: "%".to_string(),
            position: 3,
            message: String::new(),
        });
        let before = grade(&findings, 5.0).score;
        findings.details.disallowed_operators.clear();
        let after = grade(&findings, 5.0).score;
        assert!(after >= before);
    }

    #[test]
    fn test_min_score() {
        let mut findings = Findings::new();
        findings.is_valid = false;
        let report = grade(&findings, 7.0);
        assert_eq!(report.score, 6.0);
        assert!(!report.passes(None));
        assert!(report.passes(Some(5.0)));
        assert!(!report.passes(Some(6.5)));
    }
}
