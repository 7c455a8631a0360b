//! Gradecheck - grading gate for student Java submissions.
//!
//! Gradecheck checks a Java submission against an exercise's rule document
//! and can compile and run it against test inputs.
//!
//! # Architecture
//!
//! - `rules`: rule document and assessment schema, loading and validation
//! - `parser`: tree-sitter Java front-end producing a declaration tree
//! - `check`: rule checks, with an AST strategy and a textual fallback
//! - `exec`: compile and run harness with timeouts
//! - `score`: grading heuristic
//! - `grader`: batch grading over a bounded thread pool
//! - `report`: output formatting (pretty, JSON)

pub mod check;
pub mod cli;
pub mod exec;
pub mod grader;
pub mod parser;
pub mod report;
pub mod rules;
pub mod score;

pub use check::{analyze, Findings, RuleChecker, Strategy};
pub use exec::{CompiledArtifact, ExecutionOutcome, Harness, HarnessConfig};
pub use grader::{Grader, Submission};
pub use parser::{parse, ParsedSource, SyntaxFailure};
pub use rules::{Assessment, RuleError, RuleSpecification};
pub use score::GradeReport;
