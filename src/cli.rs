//! Command-line interface for gradecheck.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::exec::{Harness, HarnessConfig};
use crate::grader::{self, Grader, Submission};
use crate::report::{self, BatchReport};
use crate::rules::{self, Assessment, RuleSpecification};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default rule document names to search for.
const DEFAULT_RULE_NAMES: &[&str] = &["gradecheck.yaml", "gradecheck.json", ".gradecheck.yaml"];

/// Grading gate for student Java submissions.
///
/// Gradecheck checks a submission against an exercise's rule document:
/// required method signatures, required and forbidden patterns, allowed
/// operators, control structures, naming conventions and variable scope.
/// It can also compile the submission and run it against test inputs.
#[derive(Parser)]
#[command(name = "gradecheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a submission against a rule document
    #[command(visible_alias = "lint")]
    Check(CheckArgs),
    /// Compile a submission and run it against test inputs
    Run(RunArgs),
    /// Grade a directory of submissions
    Grade(GradeArgs),
    /// Create a new rule document from a template
    Init(InitArgs),
}

/// Compiler and runtime settings shared by the commands that execute code.
#[derive(Args, Debug, Clone)]
pub struct HarnessArgs {
    /// Java compiler command
    #[arg(long, env = "GRADECHECK_JAVAC", default_value = "javac")]
    pub javac: String,

    /// Java runtime command
    #[arg(long, env = "GRADECHECK_JAVA", default_value = "java")]
    pub java: String,

    /// Compilation timeout in seconds
    #[arg(long, env = "GRADECHECK_COMPILE_TIMEOUT", default_value_t = 10)]
    pub compile_timeout: u64,

    /// Per-input execution timeout in seconds
    #[arg(long, env = "GRADECHECK_RUN_TIMEOUT", default_value_t = 5)]
    pub run_timeout: u64,

    /// Directory for temporary build directories (default: system temp)
    #[arg(long, env = "GRADECHECK_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Argument passed to the program (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub program_args: Vec<String>,
}

impl HarnessArgs {
    pub fn to_config(&self) -> HarnessConfig {
        HarnessConfig {
            compiler: self.javac.clone(),
            runtime: self.java.clone(),
            compile_timeout: Duration::from_secs(self.compile_timeout),
            run_timeout: Duration::from_secs(self.run_timeout),
            work_root: self.work_dir.clone(),
            program_args: self.program_args.clone(),
            ..Default::default()
        }
    }
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Submission to check (file or directory)
    pub path: PathBuf,

    /// Path to the rule document (default: auto-discover)
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Minimum acceptable score (default: every check must pass)
    #[arg(short, long)]
    pub min_score: Option<f64>,

    /// Also compile and run the submission against the test inputs
    #[arg(long)]
    pub run: bool,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

/// Arguments for the run command.
#[derive(Parser)]
pub struct RunArgs {
    /// Java source file to compile and run
    pub source: PathBuf,

    /// Rule document providing the test inputs
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Input fed on stdin (repeatable; overrides the rule document)
    #[arg(short, long = "input")]
    pub inputs: Vec<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

/// Arguments for the grade command.
#[derive(Parser)]
pub struct GradeArgs {
    /// Directory of submissions (one sub-directory per student with --assessment)
    pub path: PathBuf,

    /// Rule document every `.java` file is graded against
    #[arg(short, long, conflicts_with = "assessment")]
    pub rules: Option<PathBuf>,

    /// Assessment document listing the exercises to grade
    #[arg(short, long, requires = "rules_dir")]
    pub assessment: Option<PathBuf>,

    /// Directory of rule documents, keyed by exercise id
    #[arg(long)]
    pub rules_dir: Option<PathBuf>,

    /// Number of submissions graded concurrently (default: available cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Minimum acceptable score per submission
    #[arg(short, long)]
    pub min_score: Option<f64>,

    /// Also compile and run every submission
    #[arg(long)]
    pub run: bool,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "gradecheck.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "minimal")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available rule document templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All available templates.
static TEMPLATES: &[Template] = &[
    Template {
        name: "minimal",
        description: "One required method, nothing else",
        content: include_str!("templates/minimal.yaml"),
    },
    Template {
        name: "square-root",
        description: "Square root by iteration, arithmetic restricted, with test inputs",
        content: include_str!("templates/square-root.yaml"),
    },
    Template {
        name: "style",
        description: "Naming conventions, variable scope and required loops",
        content: include_str!("templates/style.yaml"),
    },
];

/// Discover a rule document in the current directory.
fn discover_rules() -> anyhow::Result<PathBuf> {
    for name in DEFAULT_RULE_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Ok(path);
        }
    }
    anyhow::bail!(
        "no rule document found (looked for {})",
        DEFAULT_RULE_NAMES.join(", ")
    )
}

fn load_rules(path: Option<&PathBuf>) -> anyhow::Result<(PathBuf, RuleSpecification)> {
    let path = match path {
        Some(p) => p.clone(),
        None => discover_rules()?,
    };
    let spec = RuleSpecification::parse_file(&path)?;
    tracing::debug!(path = %path.display(), exercise = spec.label(), "loaded rule document");
    Ok((path, spec))
}

fn check_format(format: &str) -> bool {
    if format == "pretty" || format == "json" {
        return true;
    }
    eprintln!("Error: unknown format {:?} (expected pretty or json)", format);
    false
}

fn write_report(report: &BatchReport, format: &str, min_score: Option<f64>) -> anyhow::Result<()> {
    match format {
        "json" => report::write_json(report),
        _ => {
            report::write_pretty(report, min_score);
            Ok(())
        }
    }
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    let (rules_path, spec) = match load_rules(args.rules.as_ref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if !args.path.exists() {
        eprintln!("Error: path does not exist: {}", args.path.display());
        return Ok(EXIT_ERROR);
    }

    let files = grader::collect_java_files(&args.path)?;
    if files.is_empty() {
        eprintln!("Error: no .java files found in {}", args.path.display());
        return Ok(EXIT_ERROR);
    }

    let submissions: Vec<Submission> = files
        .into_iter()
        .map(|path| Submission::new(path, &spec))
        .collect();

    let mut grader = Grader::new();
    if args.run {
        grader = grader.with_harness(Harness::new(args.harness.to_config()));
    }
    let reports = grader.grade_all(&submissions)?;
    if reports.is_empty() {
        eprintln!("Error: no readable .java files in {}", args.path.display());
        return Ok(EXIT_ERROR);
    }

    let report = BatchReport::new(&rules_path.to_string_lossy(), reports);
    write_report(&report, &args.format, args.min_score)?;

    if report.passes(args.min_score) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the run command.
pub fn run_run(args: &RunArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    if !args.source.is_file() {
        eprintln!("Error: not a file: {}", args.source.display());
        return Ok(EXIT_ERROR);
    }

    let inputs = if !args.inputs.is_empty() {
        args.inputs.clone()
    } else if let Some(path) = &args.rules {
        match RuleSpecification::parse_file(path) {
            Ok(spec) => spec.input_values(),
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    } else {
        vec![String::new()]
    };

    let harness = Harness::new(args.harness.to_config());
    let outcomes = harness.run_inputs(&args.source, &inputs);

    match args.format.as_str() {
        "json" => report::write_outcomes_json(&outcomes)?,
        _ => report::write_outcomes_pretty(&args.source.to_string_lossy(), &outcomes),
    }

    if outcomes.iter().all(|o| o.success) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the grade command.
pub fn run_grade(args: &GradeArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    if !args.path.is_dir() {
        eprintln!("Error: not a directory: {}", args.path.display());
        return Ok(EXIT_ERROR);
    }

    let mut grader = Grader::new();
    if let Some(jobs) = args.jobs {
        grader = grader.jobs(jobs);
    }
    if args.run {
        grader = grader.with_harness(Harness::new(args.harness.to_config()));
    }

    let report = match (&args.assessment, &args.rules_dir) {
        (Some(assessment_path), Some(rules_dir)) => {
            let assessment = Assessment::parse_file(assessment_path)?;
            let specs = rules::load_rule_dir(rules_dir)?;
            tracing::info!(
                assessment = %assessment.assessment_id,
                exercises = assessment.exercises.len(),
                rule_documents = specs.len(),
                "grading assessment"
            );
            let submissions = grader::assessment_submissions(&args.path, &assessment, &specs)?;
            let reports = grader.grade_all(&submissions)?;
            BatchReport::new(&assessment_path.to_string_lossy(), reports)
        }
        _ => {
            let (rules_path, spec) = match load_rules(args.rules.as_ref()) {
                Ok(loaded) => loaded,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(EXIT_ERROR);
                }
            };
            let submissions: Vec<Submission> = grader::collect_java_files(&args.path)?
                .into_iter()
                .map(|path| Submission::new(path, &spec))
                .collect();
            let reports = grader.grade_all(&submissions)?;
            BatchReport::new(&rules_path.to_string_lossy(), reports)
        }
    };

    if report.submissions.is_empty() {
        eprintln!("Error: no submissions found in {}", args.path.display());
        return Ok(EXIT_ERROR);
    }

    write_report(&report, &args.format, args.min_score)?;

    if report.passes(args.min_score) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let template = match find_template(&args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'gradecheck init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write rule document: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to describe the exercise", args.output.display());
    println!(
        "  2. Run: gradecheck check Submission.java --rules {}",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}

fn find_template(name: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.name == name)
}

/// List available templates.
fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "minimal" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  gradecheck init --template <name>");

    Ok(EXIT_SUCCESS)
}
