//! Output formatting for gradecheck results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::check::Findings;
use crate::exec::ExecutionOutcome;
use crate::score::GradeReport;

/// Longest program output shown per run in pretty mode.
const OUTPUT_PREVIEW_LINES: usize = 5;

/// Everything gradecheck knows about one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub path: String,
    pub exercise_id: String,
    pub findings: Findings,
    pub grade: GradeReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution: Vec<ExecutionOutcome>,
}

/// Top-level report for one or more submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub version: String,
    /// Rule document or assessment the submissions were graded against
    pub rules: String,
    pub submissions: Vec<SubmissionReport>,
    pub total_score: f64,
    pub total_max_points: f64,
}

impl BatchReport {
    pub fn new(rules: &str, submissions: Vec<SubmissionReport>) -> Self {
        let total_score = submissions.iter().map(|s| s.grade.score).sum::<f64>();
        let total_max_points = submissions.iter().map(|s| s.grade.max_points).sum();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            rules: rules.to_string(),
            submissions,
            total_score: (total_score * 10.0).round() / 10.0,
            total_max_points,
        }
    }

    /// Whether every submission passes, see `GradeReport::passes`.
    pub fn passes(&self, min_score: Option<f64>) -> bool {
        self.submissions.iter().all(|s| s.grade.passes(min_score))
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// Write a report as pretty-printed JSON to stdout.
pub fn write_json(report: &BatchReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

/// Write execution outcomes as pretty-printed JSON to stdout.
pub fn write_outcomes_json(outcomes: &[ExecutionOutcome]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(outcomes)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a report in human-readable colored format.
pub fn write_pretty(report: &BatchReport, min_score: Option<f64>) {
    write_header();
    print!("  {}", "Rules: ".dimmed());
    println!("{}", report.rules);
    println!();

    for submission in &report.submissions {
        write_submission(submission, min_score);
    }

    if report.submissions.len() > 1 {
        let passed = report
            .submissions
            .iter()
            .filter(|s| s.grade.passes(min_score))
            .count();
        println!(
            "  {}  {}/{} submissions passed  Total: {}/{}",
            "Summary".bold(),
            passed,
            report.submissions.len(),
            report.total_score,
            report.total_max_points
        );
        println!();
    }
}

/// Write execution outcomes in human-readable colored format.
pub fn write_outcomes_pretty(path: &str, outcomes: &[ExecutionOutcome]) {
    write_header();
    print!("  {}", "Running: ".dimmed());
    println!("{}", path);
    println!();
    write_outcomes(outcomes);
}

fn write_header() {
    println!();
    print!("  ");
    print!("{}", "gradecheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn write_submission(s: &SubmissionReport, min_score: Option<f64>) {
    if s.grade.passes(min_score) {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }
    print!("  {}", s.path.blue());
    if !s.exercise_id.is_empty() {
        print!("{}", format!(" ({})", s.exercise_id).dimmed());
    }
    println!();
    println!();

    write_findings(&s.findings);

    if !s.execution.is_empty() {
        write_outcomes(&s.execution);
    }

    print!(
        "  {}",
        format!("{}/{} checks", s.grade.passed_checks, s.grade.total_checks).dimmed()
    );
    print!("  Score: ");
    write_colored_score(s.grade.score, s.grade.max_points);
    println!();
    println!();
}

/// Print one line per rule category, followed by its details.
pub fn write_findings(f: &Findings) {
    let d = &f.details;

    write_section("Syntax", f.syntax_ok());
    for e in &f.syntax_errors {
        println!("            line {}: {}", e.line, e.message);
    }
    if f.details.strategy == crate::check::Strategy::Textual {
        println!("            {}", "(textual checks only)".dimmed());
    }

    write_section("Methods", f.methods_ok());
    for m in &f.missing_methods {
        println!(
            "            missing {} {}({})",
            m.expected_return,
            m.name,
            m.expected_params.join(", ")
        );
    }
    for w in &d.wrong_method_names {
        println!(
            "            {} has the expected signature, expected name {}",
            w.found_name.yellow(),
            w.expected_name
        );
    }

    write_section("Patterns", f.patterns_ok());
    for p in &d.missing_patterns {
        println!("            {}", p.error_message);
    }

    write_section("Operators", f.operators_ok());
    for o in &d.disallowed_operators {
        println!("            {} at offset {}", o.operator.red(), o.position);
    }

    if let Some(cs) = &d.control_structures {
        write_section("Control structures", f.control_structures_ok());
        for m in &cs.missing {
            println!("            missing {}", m);
        }
    }

    if let Some(n) = &d.naming_conventions {
        write_section("Naming", f.naming_ok());
        for e in &n.errors {
            println!("            {} {}", format!("line {}:", e.line).dimmed(), e.message);
        }
    }

    if let Some(s) = &d.variable_scopes {
        write_section("Scope", f.scope_ok());
        for e in &s.errors {
            println!("            {}", e.message);
        }
    }

    if !d.suggestions.is_empty() {
        println!();
        println!("    {}", "Suggestions:".bold());
        for s in &d.suggestions {
            println!("      - {}", s);
        }
    }
    println!();
}

fn write_section(name: &str, passed: bool) {
    if passed {
        print!("    {} ", "OK  ".green());
    } else {
        print!("    {} ", "FAIL".red());
    }
    println!("{}", name);
}

fn write_outcomes(outcomes: &[ExecutionOutcome]) {
    println!("    {} ({}):", "Runs".bold(), outcomes.len());
    for (i, o) in outcomes.iter().enumerate() {
        let status = if o.compilation_error {
            "COMPILE".red()
        } else if o.timed_out {
            "TIMEOUT".yellow()
        } else if o.success {
            "OK     ".green()
        } else {
            "ERROR  ".red()
        };
        let input = if o.input.is_empty() {
            "(no input)".to_string()
        } else {
            format!("{:?}", o.input)
        };
        println!("      {} #{} {}", status, i + 1, input.dimmed());
        for line in o.stdout.lines().take(OUTPUT_PREVIEW_LINES) {
            println!("            {}", line);
        }
        if !o.success {
            for line in o.stderr.lines().take(OUTPUT_PREVIEW_LINES) {
                println!("            {}", line.red());
            }
        }
    }
    println!();
}

fn write_colored_score(score: f64, max: f64) {
    let text = format!("{}/{}", score, max);
    let ratio = if max > 0.0 { score / max } else { 1.0 };
    match ratio {
        r if r >= 1.0 => print!("{}", text.green().bold()),
        r if r >= 0.7 => print!("{}", text.green()),
        r if r >= 0.4 => print!("{}", text.yellow()),
        _ => print!("{}", text.red()),
    }
}
