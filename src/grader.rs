//! Grading runner that checks, scores and optionally runs submissions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::check;
use crate::exec::Harness;
use crate::report::SubmissionReport;
use crate::rules::{Assessment, RuleSpecification};
use crate::score;

/// One submission file and the rules it is graded against.
#[derive(Debug, Clone)]
pub struct Submission<'a> {
    pub path: PathBuf,
    pub spec: &'a RuleSpecification,
    /// Points the exercise is worth; overrides `spec.max_points`.
    pub max_points: f64,
}

impl<'a> Submission<'a> {
    pub fn new(path: PathBuf, spec: &'a RuleSpecification) -> Self {
        Self {
            path,
            spec,
            max_points: spec.max_points,
        }
    }
}

/// Grades submissions, in parallel on a bounded pool.
pub struct Grader {
    harness: Option<Harness>,
    jobs: usize,
}

impl Default for Grader {
    fn default() -> Self {
        Self::new()
    }
}

impl Grader {
    /// Create a grader that only runs the static checks.
    pub fn new() -> Self {
        Self {
            harness: None,
            jobs: default_jobs(),
        }
    }

    /// Also compile and run every submission with this harness.
    pub fn with_harness(mut self, harness: Harness) -> Self {
        self.harness = Some(harness);
        self
    }

    /// Set the number of submissions graded concurrently (at least 1).
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Grade a single submission.
    pub fn grade(&self, submission: &Submission) -> anyhow::Result<SubmissionReport> {
        let source = fs::read_to_string(&submission.path).map_err(|e| {
            anyhow::anyhow!("reading {}: {}", submission.path.display(), e)
        })?;

        let findings = check::analyze(&source, submission.spec);
        let grade = score::grade(&findings, submission.max_points);
        tracing::info!(
            path = %submission.path.display(),
            score = grade.score,
            max = grade.max_points,
            "graded"
        );

        let execution = match &self.harness {
            Some(harness) => harness.run_inputs(&submission.path, &submission.spec.input_values()),
            None => Vec::new(),
        };

        Ok(SubmissionReport {
            path: submission.path.to_string_lossy().to_string(),
            exercise_id: submission.spec.id.clone(),
            findings,
            grade,
            execution,
        })
    }

    /// Grade every submission. Results keep the input order; unreadable
    /// submissions are logged and left out.
    pub fn grade_all(&self, submissions: &[Submission]) -> anyhow::Result<Vec<SubmissionReport>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()?;

        let results: Vec<_> = pool.install(|| {
            submissions
                .par_iter()
                .map(|s| self.grade(s))
                .collect()
        });

        let mut reports = Vec::new();
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!(error = %e, "skipping submission"),
            }
        }
        Ok(reports)
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Every `.java` file under `root` (or `root` itself when it is a file),
/// sorted by path. Hidden directories are skipped.
pub fn collect_java_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir() && e.file_name().to_string_lossy().starts_with('.'))
        })
    {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("java")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Pair each student directory under `root` with the assessment's exercises.
///
/// Each direct sub-directory of `root` is one student. Inside it, the
/// submission for an exercise is the first `<exercise_id>.java` found.
/// Exercises without a rule document, and students missing a file, are
/// logged and skipped.
pub fn assessment_submissions<'a>(
    root: &Path,
    assessment: &Assessment,
    specs: &'a BTreeMap<String, RuleSpecification>,
) -> anyhow::Result<Vec<Submission<'a>>> {
    let mut students: Vec<PathBuf> = fs::read_dir(root)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    students.sort();

    let mut submissions = Vec::new();
    for exercise in &assessment.exercises {
        let Some(spec) = specs.get(&exercise.exercise_id) else {
            tracing::warn!(exercise = %exercise.exercise_id, "no rule document for exercise");
            continue;
        };
        let file_name = format!("{}.java", exercise.exercise_id);

        for student in &students {
            let found = WalkDir::new(student)
                .into_iter()
                .flatten()
                .find(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == file_name);
            match found {
                Some(entry) => submissions.push(Submission {
                    path: entry.path().to_path_buf(),
                    spec,
                    max_points: exercise.max_points,
                }),
                None => tracing::warn!(
                    student = %student.display(),
                    exercise = %exercise.exercise_id,
                    "no submission found"
                ),
            }
        }
    }
    Ok(submissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{AssessmentExercise, RequiredMethod};
    use tempfile::TempDir;

    fn spec(id: &str, method: &str) -> RuleSpecification {
        let mut spec = RuleSpecification {
            id: id.to_string(),
            ..Default::default()
        };
        spec.rules.required_methods = vec![RequiredMethod {
            name: method.to_string(),
            params: vec!["int".to_string()],
            return_type: "boolean".to_string(),
        }];
        spec
    }

    #[test]
    fn test_grade_all_keeps_order() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("Good.java");
        let bad = temp.path().join("Bad.java");
        fs::write(&good, "class Good { boolean estMajeur(int a) { return a >= 18; } }").unwrap();
        fs::write(&bad, "class Bad { void estMajeur(int a) { } }").unwrap();

        let spec = spec("age", "estMajeur");
        let submissions = vec![
            Submission::new(good.clone(), &spec),
            Submission::new(bad.clone(), &spec),
            Submission::new(temp.path().join("Missing.java"), &spec),
        ];
        let reports = Grader::new().jobs(2).grade_all(&submissions).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].grade.score, 10.0);
        assert!(reports[1].grade.score < 10.0);
        assert!(reports[0].execution.is_empty());
    }

    #[test]
    fn test_collect_java_files_skips_hidden() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join("a/Main.java"), "").unwrap();
        fs::write(temp.path().join(".git/Old.java"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        let files = collect_java_files(temp.path()).unwrap();
        assert_eq!(files, vec![temp.path().join("a/Main.java")]);
    }

    #[test]
    fn test_assessment_submissions() {
        let temp = TempDir::new().unwrap();
        for student in ["alice", "bob"] {
            fs::create_dir_all(temp.path().join(student).join("td3")).unwrap();
        }
        fs::write(temp.path().join("alice/td3/age.java"), "").unwrap();
        fs::write(temp.path().join("bob/td3/age.java"), "").unwrap();
        fs::write(temp.path().join("alice/td3/racine.java"), "").unwrap();

        let mut specs = BTreeMap::new();
        specs.insert("age".to_string(), spec("age", "estMajeur"));
        specs.insert("racine".to_string(), spec("racine", "calculer"));

        let assessment = Assessment {
            assessment_id: "TD3".to_string(),
            exercises: vec![
                AssessmentExercise {
                    exercise_id: "age".to_string(),
                    max_points: 4.0,
                },
                AssessmentExercise {
                    exercise_id: "racine".to_string(),
                    max_points: 6.0,
                },
                AssessmentExercise {
                    exercise_id: "unknown".to_string(),
                    max_points: 1.0,
                },
            ],
            ..Default::default()
        };

        let submissions = assessment_submissions(temp.path(), &assessment, &specs).unwrap();
        assert_eq!(submissions.len(), 3);
        assert_eq!(submissions[0].max_points, 4.0);
        assert!(submissions[0].path.ends_with("alice/td3/age.java"));
        assert!(submissions[2].path.ends_with("alice/td3/racine.java"));
        assert_eq!(submissions[2].max_points, 6.0);
    }
}
