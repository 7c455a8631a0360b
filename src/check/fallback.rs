//! Textual checks for sources the parser rejected.
//!
//! Only methods, custom patterns and operators can be evaluated without a
//! tree. The other categories are left unset.

use std::collections::BTreeSet;

use regex::Regex;

use crate::parser::SyntaxFailure;
use crate::rules::{RequiredMethod, RuleSpecification};

use super::operators::check_operators;
use super::patterns::check_custom_patterns;
use super::{
    FoundSignature, Findings, MissingMethod, RuleChecker, Strategy, WrongMethodName,
};

/// Optional modifiers accepted in front of a method declaration.
const MODIFIERS: &str = r"(?:\b(?:public|private|protected)\s+)?(?:static\s+)?(?:final\s+)?";

/// Regex-based checker used after a syntax failure.
pub struct TextualChecker<'a> {
    source: &'a str,
    failure: SyntaxFailure,
}

impl<'a> TextualChecker<'a> {
    pub fn new(source: &'a str, failure: SyntaxFailure) -> Self {
        Self { source, failure }
    }

    fn check_methods(&self, required: &[RequiredMethod], findings: &mut Findings) {
        let mut matched = BTreeSet::new();
        let mut unmatched = Vec::new();

        for req in required {
            let found = method_regex(req, Some(&req.name))
                .map(|re| re.is_match(self.source))
                .unwrap_or(false);
            if found {
                matched.insert(req.name.as_str());
                findings.add_found_method(
                    &req.name,
                    FoundSignature {
                        params: req.params.clone(),
                        return_type: req.return_type.clone(),
                    },
                );
            } else {
                unmatched.push(req);
            }
        }

        for req in unmatched {
            if findings.missing_methods.iter().any(|m| m.name == req.name) {
                continue;
            }
            findings.add_missing_method(MissingMethod::from(req));

            let Some(re) = method_regex(req, None) else {
                continue;
            };
            for caps in re.captures_iter(self.source) {
                let Some(name) = caps.name("name").map(|m| m.as_str()) else {
                    continue;
                };
                if name == req.name || matched.contains(name) {
                    continue;
                }
                findings.details.wrong_method_names.push(WrongMethodName {
                    found_name: name.to_string(),
                    expected_name: req.name.clone(),
                    return_type: req.return_type.clone(),
                    params: req.params.clone(),
                });
            }
        }
    }
}

impl RuleChecker for TextualChecker<'_> {
    fn strategy(&self) -> Strategy {
        Strategy::Textual
    }

    fn check(&self, spec: &RuleSpecification) -> Findings {
        let mut findings = Findings::new();
        findings.is_valid = false;
        findings.details.strategy = self.strategy();
        findings.syntax_errors.push(self.failure.clone().into());

        self.check_methods(&spec.rules.required_methods, &mut findings);

        findings.details.missing_patterns =
            check_custom_patterns(self.source, &spec.rules.custom_patterns);

        if let Some(allowed) = spec.allowed_operators() {
            findings.details.disallowed_operators = check_operators(self.source, allowed);
        }

        findings.add_suggestion(format!(
            "The code does not parse ({}); only methods, patterns and operators were checked.",
            self.failure
        ));
        findings
    }
}

/// Build a declaration regex for `method`.
///
/// With `name` set the method name must match exactly; otherwise any name is
/// accepted and captured as `name`.
pub fn method_regex(method: &RequiredMethod, name: Option<&str>) -> Option<Regex> {
    let name_pattern = match name {
        Some(n) => format!("(?P<name>{})", regex::escape(n)),
        None => r"(?P<name>\w+)".to_string(),
    };
    let params = method
        .params
        .iter()
        .map(|p| format!(r"(?:final\s+)?{}\s+\w+", type_pattern(p)))
        .collect::<Vec<_>>()
        .join(r"\s*,\s*");

    let pattern = format!(
        r"{}\b{}\s+{}\s*\(\s*{}\s*\)",
        MODIFIERS,
        type_pattern(&method.return_type),
        name_pattern,
        params
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(method = %method, error = %e, "cannot build method pattern");
            None
        }
    }
}

/// Regex for a type name with optional whitespace around punctuation.
/// A `T[]` type also matches `T` and `T...`.
fn type_pattern(ty: &str) -> String {
    let ty = crate::parser::java::normalize_type(ty);
    if let Some(element) = ty.strip_suffix("[]") {
        return format!(r"{}(?:\s*\[\s*\]|\s*\.\.\.)?", type_pattern(element));
    }

    let mut out = String::new();
    for c in ty.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push_str(r"\s*");
            out.push_str(&regex::escape(&c.to_string()));
            out.push_str(r"\s*");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(name: &str, params: &[&str], ret: &str) -> RequiredMethod {
        RequiredMethod {
            name: name.to_string(),
            params: params.iter().map(|s| s.to_string()).collect(),
            return_type: ret.to_string(),
        }
    }

    fn spec(methods: Vec<RequiredMethod>) -> RuleSpecification {
        let mut spec = RuleSpecification::default();
        spec.rules.required_methods = methods;
        spec
    }

    const BROKEN: &str = r#"
public class Age {
    public boolean estMajeur(int age) {
        return age >= 18;
"#;

    #[test]
    fn test_method_found_in_broken_source() {
        let checker = TextualChecker::new(BROKEN, SyntaxFailure::new(5, "missing \"}\""));
        let findings = checker.check(&spec(vec![required("estMajeur", &["int"], "boolean")]));
        assert!(!findings.is_valid);
        assert_eq!(findings.syntax_errors[0].line, 5);
        assert_eq!(findings.details.strategy, Strategy::Textual);
        assert!(findings.missing_methods.is_empty());
        assert!(findings.details.found_methods.contains_key("estMajeur"));
        assert!(findings.details.control_structures.is_none());
    }

    #[test]
    fn test_wrong_name_in_broken_source() {
        let source = "public static double racine(double x) { return Math.sqrt(x);";
        let checker = TextualChecker::new(source, SyntaxFailure::new(1, "missing \"}\""));
        let findings = checker.check(&spec(vec![required(
            "calculerRacineCarree",
            &["double"],
            "double",
        )]));
        assert_eq!(findings.missing_methods[0].name, "calculerRacineCarree");
        assert_eq!(findings.details.wrong_method_names.len(), 1);
        assert_eq!(findings.details.wrong_method_names[0].found_name, "racine");
    }

    #[test]
    fn test_duplicate_requirement_in_broken_source() {
        let checker = TextualChecker::new("int g(int x) { return x;", SyntaxFailure::new(1, "missing \"}\""));
        let req = required("f", &["int"], "int");
        let findings = checker.check(&spec(vec![req.clone(), req]));
        assert_eq!(findings.missing_methods.len(), 1);
        assert_eq!(findings.details.wrong_method_names.len(), 1);
        assert_eq!(findings.details.wrong_method_names[0].found_name, "g");
    }

    #[test]
    fn test_method_regex_shapes() {
        let main = method_regex(&required("main", &["String[]"], "void"), Some("main")).unwrap();
        assert!(main.is_match("public static void main(String[] args)"));
        assert!(main.is_match("public static void main(String args)"));
        assert!(main.is_match("static void main(String ... args)"));
        assert!(main.is_match("void main(final String [] args)"));

        let sum = method_regex(&required("sum", &["int", "int"], "int"), Some("sum")).unwrap();
        assert!(sum.is_match("private int sum(int a,int b)"));
        assert!(!sum.is_match("private int sum(int a)"));
        assert!(!sum.is_match("private long sum(int a, int b)"));
        // Return type must be a whole word.
        assert!(!sum.is_match("mint sum(int a, int b)"));

        let map = method_regex(
            &required("count", &["List<String>"], "Map<String,Integer>"),
            Some("count"),
        )
        .unwrap();
        assert!(map.is_match("Map<String, Integer> count(List<String> words)"));
    }

    #[test]
    fn test_operators_are_checked_without_a_tree() {
        let mut spec = RuleSpecification::default();
        spec.rules.allowed_operators = Some(["+".to_string()].into_iter().collect());
        let checker = TextualChecker::new("int x = a * b", SyntaxFailure::new(1, "missing \";\""));
        let findings = checker.check(&spec);
        assert_eq!(findings.details.disallowed_operators.len(), 1);
        assert_eq!(findings.details.disallowed_operators[0].operator, "*");
    }
}
