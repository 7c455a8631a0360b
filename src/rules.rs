//! Rule specification schema for gradecheck.
//!
//! A rule specification describes what a submission for one exercise must
//! contain. Documents use the camelCase layout produced by the exercise editor
//! and may be written as JSON or YAML.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Highest rule document version this build understands.
pub const CURRENT_VERSION: u32 = 1;

/// Every binary and unary operator the operator check knows about.
pub const JAVA_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "==", "!=", ">", "<", ">=", "<=", "&&", "||", "!", "&", "|", "^",
    "~", "<<", ">>", ">>>",
];

/// Errors raised while loading or validating rule documents.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported rule document version {0} (max {max})", max = CURRENT_VERSION)]
    UnsupportedVersion(u32),
    #[error("unknown operator {0:?} in allowedOperators")]
    UnknownOperator(String),
    #[error("maxPoints must be a finite, non-negative number (got {0})")]
    InvalidMaxPoints(f64),
    #[error("required method at position {0} has an empty name")]
    EmptyMethodName(usize),
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_max_points() -> f64 {
    10.0
}

fn default_difficulty() -> u32 {
    1
}

/// Top-level rule specification for one exercise.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpecification {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_max_points")]
    pub max_points: f64,
    #[serde(default)]
    pub rules: Rules,
    /// Standard-input values fed to the program by the execution harness.
    #[serde(default)]
    pub test_inputs: Vec<TestInput>,
}

impl Default for RuleSpecification {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            id: String::new(),
            name: String::new(),
            description: String::new(),
            difficulty: default_difficulty(),
            max_points: default_max_points(),
            rules: Rules::default(),
            test_inputs: Vec::new(),
        }
    }
}

impl RuleSpecification {
    /// Parse and validate a rule document. The format is picked from the
    /// extension: `.json` is JSON, anything else is read as YAML.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let spec: RuleSpecification = read_document(path)?;
        validate(&spec)?;
        Ok(spec)
    }

    /// Parse and validate a rule document held in memory.
    pub fn from_json(content: &str) -> Result<Self, RuleError> {
        let spec: RuleSpecification =
            serde_json::from_str(content).map_err(|e| RuleError::Parse {
                path: PathBuf::from("<memory>"),
                message: e.to_string(),
            })?;
        validate(&spec)?;
        Ok(spec)
    }

    /// The allowed operators, or `None` when operators are unrestricted.
    pub fn allowed_operators(&self) -> Option<&BTreeSet<String>> {
        self.rules
            .allowed_operators
            .as_ref()
            .filter(|ops| !ops.is_empty())
    }

    /// Input values for the harness, falling back to a single empty input.
    pub fn input_values(&self) -> Vec<String> {
        if self.test_inputs.is_empty() {
            vec![String::new()]
        } else {
            self.test_inputs.iter().map(|t| t.value.clone()).collect()
        }
    }

    /// Display label: the name when set, otherwise the id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// The rule categories evaluated by the checkers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    #[serde(default)]
    pub required_methods: Vec<RequiredMethod>,
    /// `None` (or an empty list) means no restriction.
    #[serde(default)]
    pub allowed_operators: Option<BTreeSet<String>>,
    #[serde(default)]
    pub required_control_structures: Vec<ControlStructure>,
    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
    #[serde(default)]
    pub check_variable_scope: bool,
    #[serde(default)]
    pub check_naming_conventions: Vec<NamingConvention>,
}

fn default_return_type() -> String {
    "void".to_string()
}

/// A method signature the submission must declare.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredMethod {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
}

impl fmt::Display for RequiredMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.return_type, self.name, self.params.join(", "))
    }
}

/// Control structures that can be required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStructure {
    If,
    For,
    While,
    Do,
    Switch,
    Try,
}

impl ControlStructure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlStructure::If => "if",
            ControlStructure::For => "for",
            ControlStructure::While => "while",
            ControlStructure::Do => "do",
            ControlStructure::Switch => "switch",
            ControlStructure::Try => "try",
        }
    }
}

impl fmt::Display for ControlStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier conventions that can be enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NamingConvention {
    /// Methods, local variables and parameters.
    #[serde(rename = "camelCase")]
    CamelCase,
    /// Classes, interfaces, enums and records.
    #[serde(rename = "PascalCase")]
    PascalCase,
    /// `static final` fields.
    #[serde(rename = "UPPER_CASE")]
    UpperCase,
}

impl NamingConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingConvention::CamelCase => "camelCase",
            NamingConvention::PascalCase => "PascalCase",
            NamingConvention::UpperCase => "UPPER_CASE",
        }
    }
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An instructor-supplied regex evaluated against the whole source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPattern {
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    /// Informational patterns (`required: false`) are never reported.
    #[serde(default)]
    pub required: bool,
    /// A negative pattern must NOT be present.
    #[serde(default)]
    pub negative: bool,
    #[serde(default)]
    pub error_message: String,
}

/// One standard-input value for the execution harness.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TestInput {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
}

/// Validate a rule specification for correctness.
pub fn validate(spec: &RuleSpecification) -> Result<(), RuleError> {
    if spec.version == 0 || spec.version > CURRENT_VERSION {
        return Err(RuleError::UnsupportedVersion(spec.version));
    }

    if !spec.max_points.is_finite() || spec.max_points < 0.0 {
        return Err(RuleError::InvalidMaxPoints(spec.max_points));
    }

    for (i, m) in spec.rules.required_methods.iter().enumerate() {
        if m.name.trim().is_empty() {
            return Err(RuleError::EmptyMethodName(i));
        }
    }

    if let Some(ops) = &spec.rules.allowed_operators {
        for op in ops {
            if !JAVA_OPERATORS.contains(&op.as_str()) {
                return Err(RuleError::UnknownOperator(op.clone()));
            }
        }
    }

    // Custom pattern regexes are compiled at check time; an invalid one
    // becomes a missing-pattern finding there.
    Ok(())
}

/// Load every rule document in a directory, keyed by id.
///
/// Documents that fail to load, or have no id, are logged and skipped.
pub fn load_rule_dir<P: AsRef<Path>>(
    dir: P,
) -> Result<BTreeMap<String, RuleSpecification>, RuleError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| RuleError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut specs = BTreeMap::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !is_document(&path) {
            continue;
        }
        match RuleSpecification::parse_file(&path) {
            Ok(spec) if !spec.id.is_empty() => {
                specs.insert(spec.id.clone(), spec);
            }
            Ok(_) => tracing::warn!(path = %path.display(), "rule document has no id, skipping"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping rule document"),
        }
    }
    Ok(specs)
}

/// A graded assessment grouping several exercises.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default)]
    pub assessment_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<AssessmentExercise>,
    #[serde(default)]
    pub total_max_points: f64,
}

/// An exercise slot inside an assessment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentExercise {
    pub exercise_id: String,
    #[serde(default)]
    pub max_points: f64,
}

impl Assessment {
    /// Parse an assessment document (JSON or YAML by extension).
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let mut assessment: Assessment = read_document(path.as_ref())?;
        assessment.update_total();
        Ok(assessment)
    }

    pub fn exercise_ids(&self) -> Vec<&str> {
        self.exercises
            .iter()
            .map(|e| e.exercise_id.as_str())
            .collect()
    }

    /// Max points for an exercise, or 0 when it is not part of the assessment.
    pub fn exercise_max_points(&self, exercise_id: &str) -> f64 {
        self.exercises
            .iter()
            .find(|e| e.exercise_id == exercise_id)
            .map(|e| e.max_points)
            .unwrap_or(0.0)
    }

    /// Recompute the total from the exercise entries.
    pub fn update_total(&mut self) {
        self.total_max_points = self.exercises.iter().map(|e| e.max_points).sum();
    }
}

fn is_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("yaml") | Some("yml")
    )
}

fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RuleError> {
    let content = fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| RuleError::Parse {
        path: path.to_path_buf(),
        message,
    };
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))
    } else {
        serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exercise_document() {
        let json = r#"{
  "id": "09-fonction-racine-carree",
  "name": "Racine carrée",
  "maxPoints": 5,
  "rules": {
    "requiredMethods": [
      {"name": "calculerRacineCarree", "params": ["double"], "returnType": "double"}
    ],
    "allowedOperators": ["<", ">="],
    "requiredControlStructures": ["if"],
    "customPatterns": [
      {"pattern": "Math\\.sqrt", "description": "Uses Math.sqrt", "required": true}
    ],
    "checkNamingConventions": ["camelCase"]
  },
  "testInputs": [{"value": "4"}, {"value": "-4", "description": "negative"}],
  "mathFunctions": ["sqrt"]
}"#;
        let spec = RuleSpecification::from_json(json).unwrap();
        assert_eq!(spec.id, "09-fonction-racine-carree");
        assert_eq!(spec.max_points, 5.0);
        assert_eq!(spec.rules.required_methods[0].return_type, "double");
        assert_eq!(
            spec.rules.required_control_structures,
            vec![ControlStructure::If]
        );
        assert_eq!(
            spec.rules.check_naming_conventions,
            vec![NamingConvention::CamelCase]
        );
        assert_eq!(spec.input_values(), vec!["4", "-4"]);
        assert!(!spec.rules.check_variable_scope);
    }

    #[test]
    fn test_defaults_mean_no_constraint() {
        let spec = RuleSpecification::from_json(r#"{"id": "x"}"#).unwrap();
        assert_eq!(spec.max_points, 10.0);
        assert!(spec.allowed_operators().is_none());
        assert_eq!(spec.input_values(), vec![String::new()]);
    }

    #[test]
    fn test_empty_operator_list_is_unrestricted() {
        let spec =
            RuleSpecification::from_json(r#"{"rules": {"allowedOperators": []}}"#).unwrap();
        assert!(spec.allowed_operators().is_none());
    }

    #[test]
    fn test_return_type_defaults_to_void() {
        let spec = RuleSpecification::from_json(
            r#"{"rules": {"requiredMethods": [{"name": "main", "params": ["String[]"]}]}}"#,
        )
        .unwrap();
        assert_eq!(spec.rules.required_methods[0].return_type, "void");
        assert_eq!(
            spec.rules.required_methods[0].to_string(),
            "void main(String[])"
        );
    }

    #[test]
    fn test_rejects_unknown_operator() {
        let err = RuleSpecification::from_json(r#"{"rules": {"allowedOperators": ["**"]}}"#)
            .unwrap_err();
        assert!(matches!(err, RuleError::UnknownOperator(op) if op == "**"));
    }

    #[test]
    fn test_rejects_unknown_structure() {
        let err =
            RuleSpecification::from_json(r#"{"rules": {"requiredControlStructures": ["goto"]}}"#)
                .unwrap_err();
        assert!(matches!(err, RuleError::Parse { .. }));
    }

    #[test]
    fn test_rejects_future_version() {
        let err = RuleSpecification::from_json(r#"{"version": 7}"#).unwrap_err();
        assert!(matches!(err, RuleError::UnsupportedVersion(7)));
    }

    #[test]
    fn test_rejects_negative_points() {
        let err = RuleSpecification::from_json(r#"{"maxPoints": -1}"#).unwrap_err();
        assert!(matches!(err, RuleError::InvalidMaxPoints(_)));
    }

    #[test]
    fn test_yaml_document() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("ex.yaml");
        std::fs::write(
            &path,
            r#"
id: estMajeur
maxPoints: 10
rules:
  requiredMethods:
    - name: estMajeur
      params: [int]
      returnType: boolean
"#,
        )
        .unwrap();
        let spec = RuleSpecification::parse_file(&path).unwrap();
        assert_eq!(spec.rules.required_methods.len(), 1);
        assert_eq!(spec.rules.required_methods[0].params, vec!["int"]);
    }

    #[test]
    fn test_load_rule_dir_skips_broken_documents() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.json"), r#"{"id": "a"}"#).unwrap();
        std::fs::write(temp.path().join("b.json"), "{ not json").unwrap();
        std::fs::write(temp.path().join("c.json"), r#"{"name": "no id"}"#).unwrap();
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let specs = load_rule_dir(temp.path()).unwrap();
        assert_eq!(specs.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_assessment_points() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("TD3.json");
        std::fs::write(
            &path,
            r#"{
  "assessmentId": "TD3",
  "name": "TD 3",
  "exercises": [
    {"exerciseId": "09-fonction-racine-carree", "maxPoints": 6},
    {"exerciseId": "10-comptage-mots", "maxPoints": 4}
  ],
  "totalMaxPoints": 0
}"#,
        )
        .unwrap();
        let assessment = Assessment::parse_file(&path).unwrap();
        assert_eq!(assessment.total_max_points, 10.0);
        assert_eq!(assessment.exercise_max_points("10-comptage-mots"), 4.0);
        assert_eq!(assessment.exercise_max_points("missing"), 0.0);
        assert_eq!(
            assessment.exercise_ids(),
            vec!["09-fonction-racine-carree", "10-comptage-mots"]
        );
    }
}
