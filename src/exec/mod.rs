//! Compile and run harness for Java submissions.
//!
//! A submission goes through two strictly ordered phases. `Harness::compile`
//! copies the source into a working directory, fixes the file name to match
//! the declared public class, and runs the compiler. It returns a
//! `CompiledArtifact` that `Harness::execute` runs once per input. A compile
//! failure is terminal: `run_inputs` then reports it for every input without
//! spawning anything.

mod process;

pub use process::{run_with_timeout, ProcessOutput};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref PUBLIC_CLASS: Regex = Regex::new(r"public\s+class\s+(\w+)").unwrap();
    static ref WRONG_FILE_NAME: Regex =
        Regex::new(r"class\s+(\w+)\s+(?:is\s+public,\s+)?should\s+be\s+declared\s+in\s+a\s+file\s+named")
            .unwrap();
}

/// Settings for the compiler and runtime processes.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Compiler command, invoked as `[compiler, ...compiler_args, file]`.
    pub compiler: String,
    pub compiler_args: Vec<String>,
    /// Runtime command, invoked as
    /// `[runtime, ...runtime_args, "-cp", dir, class, ...program_args]`.
    pub runtime: String,
    pub runtime_args: Vec<String>,
    pub program_args: Vec<String>,
    pub compile_timeout: Duration,
    pub run_timeout: Duration,
    /// Parent of the per-submission working directories; the system temp
    /// directory when unset.
    pub work_root: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: "javac".to_string(),
            compiler_args: Vec::new(),
            runtime: "java".to_string(),
            runtime_args: Vec::new(),
            program_args: Vec::new(),
            compile_timeout: Duration::from_secs(10),
            run_timeout: Duration::from_secs(5),
            work_root: None,
        }
    }
}

/// A compiled submission ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Directory holding the `.class` files, used as the classpath.
    pub class_dir: PathBuf,
    /// Class to launch.
    pub class_name: String,
}

/// Why a submission did not compile.
#[derive(Debug, Error)]
pub enum CompileFailure {
    /// Compiler diagnostics.
    #[error("{0}")]
    Diagnostics(String),
    #[error("Compilation timed out (> {0:?})")]
    Timeout(Duration),
    #[error("cannot start compiler {command:?}: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot prepare working directory: {0}")]
    Io(#[from] io::Error),
}

/// Why a compiled submission could not be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no class file found in {0:?}")]
    NoClassFile(PathBuf),
    #[error("cannot start runtime {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Result of running a submission against one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub input: String,
    pub success: bool,
    pub compilation_error: bool,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

impl ExecutionOutcome {
    fn compile_failed(input: &str, diagnostics: &str) -> Self {
        Self {
            input: input.to_string(),
            compilation_error: true,
            stderr: diagnostics.to_string(),
            ..Default::default()
        }
    }

    fn launch_failed(input: &str, error: &LaunchError) -> Self {
        Self {
            input: input.to_string(),
            stderr: error.to_string(),
            ..Default::default()
        }
    }
}

/// Compiles and runs Java submissions.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Compile `source_path` inside `work_dir`.
    ///
    /// If the declared public class does not match the file name, a correctly
    /// named copy is compiled instead. If the compiler still complains about
    /// the file name, the class it names gets a copy and compilation is
    /// retried once.
    pub fn compile(
        &self,
        source_path: &Path,
        work_dir: &Path,
    ) -> Result<CompiledArtifact, CompileFailure> {
        let source = fs::read_to_string(source_path)?;
        fs::create_dir_all(work_dir)?;

        let file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Main.java".to_string());
        let mut class_name = file_name
            .strip_suffix(".java")
            .unwrap_or(&file_name)
            .to_string();

        let mut target = work_dir.join(&file_name);
        fs::write(&target, &source)?;

        if let Some(declared) = declared_public_class(&source) {
            if declared != class_name {
                tracing::info!(
                    file = %file_name,
                    class = %declared,
                    "public class does not match file name, compiling a renamed copy"
                );
                target = work_dir.join(format!("{}.java", declared));
                fs::write(&target, &source)?;
                class_name = declared;
            }
        }

        match self.run_compiler(&target) {
            Ok(()) => {}
            Err(CompileFailure::Diagnostics(diagnostics)) => {
                let Some(named) = class_named_in_diagnostics(&diagnostics) else {
                    return Err(CompileFailure::Diagnostics(diagnostics));
                };
                if named == class_name {
                    return Err(CompileFailure::Diagnostics(diagnostics));
                }
                tracing::info!(class = %named, "compiler asked for another file name, retrying");
                target = work_dir.join(format!("{}.java", named));
                fs::write(&target, &source)?;
                self.run_compiler(&target)?;
                class_name = named;
            }
            Err(e) => return Err(e),
        }

        tracing::debug!(class = %class_name, dir = %work_dir.display(), "compiled");
        Ok(CompiledArtifact {
            class_dir: work_dir.to_path_buf(),
            class_name,
        })
    }

    fn run_compiler(&self, file: &Path) -> Result<(), CompileFailure> {
        let mut cmd = Command::new(&self.config.compiler);
        cmd.args(&self.config.compiler_args).arg(file);

        let output = run_with_timeout(&mut cmd, None, self.config.compile_timeout).map_err(
            |source| CompileFailure::Launch {
                command: self.config.compiler.clone(),
                source,
            },
        )?;

        if output.timed_out {
            tracing::warn!(file = %file.display(), "compilation timed out");
            return Err(CompileFailure::Timeout(self.config.compile_timeout));
        }
        if output.success {
            return Ok(());
        }

        let diagnostics = if output.stderr.trim().is_empty() {
            output.stdout
        } else {
            output.stderr
        };
        tracing::debug!(file = %file.display(), %diagnostics, "compilation failed");
        Err(CompileFailure::Diagnostics(diagnostics))
    }

    /// Run a compiled submission with `input` on standard input.
    pub fn execute(&self, artifact: &CompiledArtifact, input: &str) -> ExecutionOutcome {
        let class_name = match resolve_class(artifact) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "cannot launch submission");
                return ExecutionOutcome::launch_failed(input, &e);
            }
        };

        let mut cmd = Command::new(&self.config.runtime);
        cmd.args(&self.config.runtime_args)
            .arg("-cp")
            .arg(&artifact.class_dir)
            .arg(&class_name)
            .args(&self.config.program_args);

        tracing::debug!(class = %class_name, input, "running");
        let output = match run_with_timeout(&mut cmd, Some(input), self.config.run_timeout) {
            Ok(output) => output,
            Err(source) => {
                let e = LaunchError::Spawn {
                    command: self.config.runtime.clone(),
                    source,
                };
                tracing::warn!(error = %e, "cannot launch submission");
                return ExecutionOutcome::launch_failed(input, &e);
            }
        };

        if output.timed_out {
            tracing::warn!(class = %class_name, input, "execution timed out");
            return ExecutionOutcome {
                input: input.to_string(),
                stdout: output.stdout,
                stderr: format!("Execution timed out (> {:?})", self.config.run_timeout),
                timed_out: true,
                ..Default::default()
            };
        }

        ExecutionOutcome {
            input: input.to_string(),
            success: output.success,
            compilation_error: false,
            stdout: output.stdout,
            stderr: output.stderr,
            timed_out: false,
            exit_code: output.exit_code,
        }
    }

    /// Compile `source_path` once and run it against every input, in order.
    pub fn run_inputs(&self, source_path: &Path, inputs: &[String]) -> Vec<ExecutionOutcome> {
        let work_dir = match self.work_dir() {
            Ok(dir) => dir,
            Err(e) => {
                let failure = CompileFailure::Io(e);
                return inputs
                    .iter()
                    .map(|i| ExecutionOutcome::compile_failed(i, &failure.to_string()))
                    .collect();
            }
        };

        match self.compile(source_path, work_dir.path()) {
            Ok(artifact) => inputs
                .iter()
                .map(|input| self.execute(&artifact, input))
                .collect(),
            Err(failure) => {
                tracing::info!(
                    source = %source_path.display(),
                    error = %failure,
                    "compilation failed, skipping execution"
                );
                let diagnostics = failure.to_string();
                inputs
                    .iter()
                    .map(|i| ExecutionOutcome::compile_failed(i, &diagnostics))
                    .collect()
            }
        }
    }

    fn work_dir(&self) -> io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gradecheck-");
        match &self.config.work_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }
}

/// Name of the first `public class` declared in `source`.
pub fn declared_public_class(source: &str) -> Option<String> {
    PUBLIC_CLASS
        .captures(source)
        .map(|caps| caps[1].to_string())
}

fn class_named_in_diagnostics(diagnostics: &str) -> Option<String> {
    WRONG_FILE_NAME
        .captures(diagnostics)
        .map(|caps| caps[1].to_string())
}

/// The class to launch: the expected one, else the only top-level class file.
fn resolve_class(artifact: &CompiledArtifact) -> Result<String, LaunchError> {
    let expected = artifact
        .class_dir
        .join(format!("{}.class", artifact.class_name));
    if expected.is_file() {
        return Ok(artifact.class_name.clone());
    }

    let no_class = || LaunchError::NoClassFile(artifact.class_dir.clone());
    let entries = fs::read_dir(&artifact.class_dir).map_err(|_| no_class())?;
    let classes: Vec<String> = entries
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            let stem = name.strip_suffix(".class")?;
            // Inner and anonymous classes.
            (!stem.contains('$')).then(|| stem.to_string())
        })
        .collect();

    match classes.as_slice() {
        [only] => {
            tracing::info!(expected = %artifact.class_name, found = %only, "using the only class file");
            Ok(only.clone())
        }
        _ => Err(no_class()),
    }
}
