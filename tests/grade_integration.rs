//! Integration tests for batch grading and the JSON report.

use std::path::PathBuf;

use gradecheck::grader::{self, Grader, Submission};
use gradecheck::report::BatchReport;
use gradecheck::rules::{self, Assessment, RuleSpecification};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn grade_td3() -> BatchReport {
    let testdata = testdata_path();
    let assessment = Assessment::parse_file(testdata.join("td3.json")).expect("should parse assessment");
    let specs = rules::load_rule_dir(testdata.join("rules")).expect("should load rules");

    let submissions = grader::assessment_submissions(&testdata.join("td3"), &assessment, &specs)
        .expect("should discover submissions");
    let reports = Grader::new()
        .jobs(2)
        .grade_all(&submissions)
        .expect("grading should succeed");
    BatchReport::new("td3.json", reports)
}

#[test]
fn test_assessment_document() {
    let assessment = Assessment::parse_file(testdata_path().join("td3.json")).unwrap();
    assert_eq!(assessment.assessment_id, "TD3");
    assert_eq!(assessment.exercise_ids(), vec!["age", "racine"]);
    assert_eq!(assessment.exercise_max_points("racine"), 6.0);
    assert_eq!(assessment.exercise_max_points("missing"), 0.0);
    assert_eq!(assessment.total_max_points, 10.0);
}

#[test]
fn test_assessment_grading() {
    let report = grade_td3();

    let graded: Vec<(String, &str, f64)> = report
        .submissions
        .iter()
        .map(|s| {
            let student = PathBuf::from(&s.path)
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            (student, s.exercise_id.as_str(), s.grade.score)
        })
        .collect();

    assert_eq!(
        graded,
        vec![
            ("alice".to_string(), "age", 4.0),
            ("bob".to_string(), "age", 3.4),
            ("alice".to_string(), "racine", 6.0),
            ("carol".to_string(), "racine", 3.4),
        ]
    );
    assert_eq!(report.total_score, 16.8);
    assert_eq!(report.total_max_points, 20.0);
    assert!(!report.passes(None));
    assert!(report.passes(Some(3.0)));
}

#[test]
fn test_single_rule_document_over_directory() {
    let testdata = testdata_path();
    let spec = RuleSpecification::parse_file(testdata.join("rules/age.json")).unwrap();
    let files = grader::collect_java_files(&testdata.join("submissions")).unwrap();
    assert_eq!(files.len(), 4);

    let submissions: Vec<Submission> = files
        .into_iter()
        .map(|path| Submission::new(path, &spec))
        .collect();
    let reports = Grader::new().grade_all(&submissions).unwrap();

    let scores: Vec<f64> = reports.iter().map(|r| r.grade.score).collect();
    // Age, MissingBrace, WrongName, WrongReturn
    assert_eq!(scores, vec![10.0, 8.6, 8.6, 8.6]);
}

#[test]
fn test_json_report_structure() {
    let report = grade_td3();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["rules"], "td3.json");
    assert_eq!(json["submissions"].as_array().unwrap().len(), 4);

    let first = &json["submissions"][0];
    assert_eq!(first["exercise_id"], "age");
    assert_eq!(first["grade"]["max_points"], 4.0);
    assert_eq!(first["grade"]["total_checks"], 7);
    assert_eq!(first["grade"]["checks"][0]["name"], "syntax");
    assert!(first.get("execution").is_none());

    let round_trip: BatchReport = serde_json::from_value(json).unwrap();
    assert_eq!(round_trip.submissions.len(), 4);
}
