//! Disallowed operator detection.
//!
//! The scan is textual so it behaves the same whether or not the source
//! parsed. Comments and literal contents are blanked first; blanking keeps
//! every character in place, so reported positions are offsets into the
//! original source.

use std::collections::BTreeSet;

use crate::rules::JAVA_OPERATORS;

use super::DisallowedOperator;

/// Every operator-like token in Java, longest first within a shared prefix.
///
/// Tokens that are not in `JAVA_OPERATORS` (`++`, `+=`, `->`, `<>`, ...) are
/// only here so that longest-match tokenization never splits them.
const TOKENS: &[&str] = &[
    ">>>=", ">>>", ">>=", "<<=", ">>", "<<", ">=", "<=", "==", "!=", "&&", "||", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "->", "::", "<>", "+", "-", "*", "/", "%",
    ">", "<", "!", "&", "|", "^", "~", "=", "?", ":",
];

const ARITHMETIC: &[&str] = &["+", "-", "*", "/", "%"];

/// Find every use of an operator outside `allowed`.
pub fn check_operators(source: &str, allowed: &BTreeSet<String>) -> Vec<DisallowedOperator> {
    let disallowed: Vec<&str> = JAVA_OPERATORS
        .iter()
        .copied()
        .filter(|op| !allowed.contains(*op))
        .collect();
    if disallowed.is_empty() {
        return Vec::new();
    }

    let allowed_list = allowed.iter().cloned().collect::<Vec<_>>().join(", ");
    let code = blank_non_code(source);
    let mut found = Vec::new();

    let mut i = 0;
    while i < code.len() {
        let Some(token) = token_at(&code, i) else {
            i += 1;
            continue;
        };
        let end = i + token.chars().count();

        if disallowed.contains(&token) && is_operator_use(&code, i, end, token) {
            found.push(DisallowedOperator {
                operator: token.to_string(),
                position: i,
                message: format!(
                    "operator '{}' is not allowed; use only: {}",
                    token, allowed_list
                ),
            });
        }
        i = end;
    }

    found
}

/// Longest token starting at `pos`.
fn token_at(code: &[char], pos: usize) -> Option<&'static str> {
    TOKENS
        .iter()
        .copied()
        .filter(|t| {
            t.chars()
                .enumerate()
                .all(|(k, c)| code.get(pos + k) == Some(&c))
        })
        .max_by_key(|t| t.len())
}

fn is_operator_use(code: &[char], start: usize, end: usize, token: &str) -> bool {
    if ARITHMETIC.contains(&token) {
        // Only between two operands: `a + 1`, `x*y`.
        let before = code[..start].iter().rev().find(|c| !c.is_whitespace());
        let after = code[end..].iter().find(|c| !c.is_whitespace());
        matches!((before, after), (Some(b), Some(a)) if is_word_char(*b) && is_word_char(*a))
    } else {
        let before = start.checked_sub(1).and_then(|k| code.get(k));
        let after = code.get(end);
        !(before.is_some_and(|c| c.is_alphanumeric()) || after.is_some_and(|c| c.is_alphanumeric()))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str,
    TextBlock,
    Char,
}

/// Replace comments and the contents of string, text block and char literals
/// with spaces. Quotes and newlines are kept.
pub fn blank_non_code(source: &str) -> Vec<char> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = chars.clone();
    let mut state = State::Code;

    let at = |i: usize, s: &str| s.chars().enumerate().all(|(k, c)| chars.get(i + k) == Some(&c));
    let blank = |out: &mut Vec<char>, i: usize| {
        if out[i] != '\n' {
            out[i] = ' ';
        }
    };

    let mut i = 0;
    while i < chars.len() {
        match state {
            State::Code => {
                if at(i, "//") {
                    state = State::LineComment;
                    continue;
                } else if at(i, "/*") {
                    blank(&mut out, i);
                    blank(&mut out, i + 1);
                    state = State::BlockComment;
                    i += 2;
                    continue;
                } else if at(i, "\"\"\"") {
                    state = State::TextBlock;
                    i += 3;
                    continue;
                } else if chars[i] == '"' {
                    state = State::Str;
                } else if chars[i] == '\'' {
                    state = State::Char;
                }
            }
            State::LineComment => {
                if chars[i] == '\n' {
                    state = State::Code;
                } else {
                    blank(&mut out, i);
                }
            }
            State::BlockComment => {
                if at(i, "*/") {
                    blank(&mut out, i);
                    blank(&mut out, i + 1);
                    state = State::Code;
                    i += 2;
                    continue;
                }
                blank(&mut out, i);
            }
            State::TextBlock => {
                if at(i, "\"\"\"") {
                    state = State::Code;
                    i += 3;
                    continue;
                }
                if chars[i] == '\\' && i + 1 < chars.len() {
                    blank(&mut out, i);
                    blank(&mut out, i + 1);
                    i += 2;
                    continue;
                }
                blank(&mut out, i);
            }
            State::Str | State::Char => {
                let quote = if state == State::Str { '"' } else { '\'' };
                if chars[i] == quote || chars[i] == '\n' {
                    state = State::Code;
                } else if chars[i] == '\\' && i + 1 < chars.len() {
                    blank(&mut out, i);
                    blank(&mut out, i + 1);
                    i += 2;
                    continue;
                } else {
                    blank(&mut out, i);
                }
            }
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(ops: &[&str]) -> BTreeSet<String> {
        ops.iter().map(|s| s.to_string()).collect()
    }

    fn operators(found: &[DisallowedOperator]) -> Vec<&str> {
        found.iter().map(|d| d.operator.as_str()).collect()
    }

    #[test]
    fn test_arithmetic_between_operands() {
        let found = check_operators("int y = a * b;", &allow(&["+", "="]));
        assert_eq!(operators(&found), vec!["*"]);
        assert_eq!(found[0].position, 10);
        assert!(found[0].message.contains("'*'"));
    }

    #[test]
    fn test_every_known_operator_outside_the_allowed_set() {
        let found = check_operators("int y = a >>> 2; int z = a ^ b;", &allow(&["+"]));
        assert_eq!(operators(&found), vec![">>>", "^"]);
        let all: Vec<&str> = JAVA_OPERATORS.to_vec();
        assert!(check_operators("int y = a >>> 2; int z = a ^ b;", &allow(&all)).is_empty());
    }

    #[test]
    fn test_longest_match_tokens() {
        // `++` and `+=` are not `+`; `>=` is not `>`.
        let source = "for (int i = 0; i < n; i++) { s += i; } boolean b = x >= 18;";
        let found = check_operators(source, &allow(&["<", ">="]));
        assert!(operators(&found).is_empty());

        let found = check_operators("boolean b = x >= 18;", &allow(&["<"]));
        assert_eq!(operators(&found), vec![">="]);
    }

    #[test]
    fn test_adjacent_alphanumeric_is_skipped() {
        // Generic brackets touch identifiers.
        let source = "List<String> names = new ArrayList<>();";
        assert!(check_operators(source, &allow(&["+"])).is_empty());
    }

    #[test]
    fn test_comments_and_strings_are_ignored() {
        let source = r#"
// a * b in a comment
/* x % y */
String s = "p * q";
char c = '*';
int z = a + b;
"#;
        let found = check_operators(source, &allow(&["+"]));
        assert!(operators(&found).is_empty());
    }

    #[test]
    fn test_unary_minus_is_not_arithmetic() {
        let found = check_operators("int y = -1; int z = (-x);", &allow(&["+"]));
        assert!(found.is_empty());
    }

    #[test]
    fn test_position_is_character_offset() {
        let source = "String s = \"é\"; int k = a % b;";
        let found = check_operators(source, &allow(&["+"]));
        assert_eq!(found.len(), 1);
        let offset = source.chars().position(|c| c == '%').unwrap();
        assert_eq!(found[0].position, offset);
    }

    #[test]
    fn test_blanking_preserves_length() {
        let source = "a /* b */ c // d\n\"e\\\"f\" '\\n'";
        let blanked = blank_non_code(source);
        assert_eq!(blanked.len(), source.chars().count());
        let text: String = blanked.into_iter().collect();
        assert_eq!(text, "a         c     \n\"    \" '  '");
    }
}
