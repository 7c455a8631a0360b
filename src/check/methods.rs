//! Required method matching against the declaration tree.

use crate::parser::{DeclarationTree, MethodDecl};
use crate::rules::RequiredMethod;

use super::{FoundSignature, MissingMethod, WrongMethodName};

/// Outcome of matching required methods.
#[derive(Debug, Default)]
pub struct MethodMatch {
    pub found: Vec<(String, FoundSignature)>,
    pub missing: Vec<MissingMethod>,
    pub wrong_names: Vec<WrongMethodName>,
}

/// Whether a declared parameter type satisfies a required one.
///
/// A required `T[]` also accepts a declared `T`.
pub fn param_matches(required: &str, declared: &str) -> bool {
    let required = crate::parser::java::normalize_type(required);
    let declared = crate::parser::java::normalize_type(declared);
    required == declared
        || required
            .strip_suffix("[]")
            .is_some_and(|element| element == declared)
}

/// Same return type and parameter shape, ignoring the name.
pub fn shape_matches(required: &RequiredMethod, method: &MethodDecl) -> bool {
    crate::parser::java::normalize_type(&required.return_type) == method.return_type
        && required.params.len() == method.params.len()
        && required
            .params
            .iter()
            .zip(&method.params)
            .all(|(r, d)| param_matches(r, d))
}

fn signature_matches(required: &RequiredMethod, method: &MethodDecl) -> bool {
    required.name == method.name && shape_matches(required, method)
}

/// Match every required method against the declared ones.
///
/// The first declared method with the same name, parameters and return type
/// wins. For requirements with no match, methods of the same shape under
/// another name are reported as likely typos; methods that satisfied a
/// different requirement are not.
pub fn match_methods(tree: &DeclarationTree, required: &[RequiredMethod]) -> MethodMatch {
    let mut result = MethodMatch::default();
    let mut unmatched = Vec::new();

    for req in required {
        match tree.methods().find(|m| signature_matches(req, m)) {
            Some(m) => result.found.push((
                m.name.clone(),
                FoundSignature {
                    params: m.params.clone(),
                    return_type: m.return_type.clone(),
                },
            )),
            None => unmatched.push(req),
        }
    }

    for req in unmatched {
        // Duplicated requirements are reported once.
        if result.missing.iter().any(|m| m.name == req.name) {
            continue;
        }
        result.missing.push(MissingMethod::from(req));
        for m in tree.methods() {
            if m.name == req.name || !shape_matches(req, m) {
                continue;
            }
            if required.iter().any(|r| signature_matches(r, m)) {
                continue;
            }
            result.wrong_names.push(WrongMethodName {
                found_name: m.name.clone(),
                expected_name: req.name.clone(),
                return_type: m.return_type.clone(),
                params: m.params.clone(),
            });
        }
    }

    result
}
