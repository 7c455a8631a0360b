//! Java language support built on tree-sitter.

use std::collections::BTreeMap;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, Tree};

use super::{ClassDecl, DeclarationTree, MethodDecl, SyntaxFailure};

/// Tree-sitter query for type declarations.
///
/// Captures:
/// - `type_name`: class, interface and enum names
/// - `type`: the declaration node
const TYPE_QUERY: &str = r#"
(class_declaration name: (identifier) @type_name) @type
(interface_declaration name: (identifier) @type_name) @type
(enum_declaration name: (identifier) @type_name) @type
"#;

/// Tree-sitter query for method declarations.
const METHOD_QUERY: &str = r#"
(method_declaration name: (identifier) @method_name) @method
"#;

/// Node kinds that own methods.
const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Longest error snippet quoted in a syntax failure message.
const SNIPPET_LEN: usize = 40;

pub fn language() -> Language {
    tree_sitter_java::LANGUAGE.into()
}

/// Parse source code and return the tree.
pub fn parse_tree(source: &str) -> anyhow::Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&language())?;
    parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse source"))
}

/// Run a query and collect every capture as `(capture name, node)`.
pub fn run_query<'t>(
    tree: &'t Tree,
    source: &[u8],
    query_src: &str,
) -> anyhow::Result<Vec<(String, Node<'t>)>> {
    let query = Query::new(&language(), query_src)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), source);

    let mut captures = Vec::new();
    while let Some(m) = matches.next() {
        for capture in m.captures {
            let name = query.capture_names()[capture.index as usize];
            captures.push((name.to_string(), capture.node));
        }
    }
    Ok(captures)
}

/// Return the first ERROR or MISSING node as a syntax failure.
pub fn first_syntax_error(tree: &Tree, source: &str) -> Option<SyntaxFailure> {
    let node = find_error_node(tree.root_node())?;
    let line = node.start_position().row + 1;

    let message = if node.is_missing() {
        format!("missing {:?}", node.kind())
    } else {
        let text = node.utf8_text(source.as_bytes()).unwrap_or("");
        let snippet: String = text
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .chars()
            .take(SNIPPET_LEN)
            .collect();
        if snippet.is_empty() {
            "syntax error".to_string()
        } else {
            format!("unexpected {:?}", snippet)
        }
    };

    Some(SyntaxFailure::new(line, message))
}

fn find_error_node(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(find_error_node)
}

/// Build the declaration tree from a parsed file.
pub fn extract_declarations(tree: &Tree, source: &str) -> anyhow::Result<DeclarationTree> {
    let bytes = source.as_bytes();

    // Keyed by start byte so methods can find their owner.
    let mut classes: BTreeMap<usize, ClassDecl> = BTreeMap::new();
    for (capture, node) in run_query(tree, bytes, TYPE_QUERY)? {
        if capture == "type" {
            classes
                .entry(node.start_byte())
                .or_insert_with(|| class_from_node(node, bytes));
        }
    }

    for (capture, node) in run_query(tree, bytes, METHOD_QUERY)? {
        if capture != "method" {
            continue;
        }
        let method = method_from_node(node, bytes);
        let line = method.line;
        let owner = enclosing_type(node);
        let key = owner.map(|n| n.start_byte()).unwrap_or(usize::MAX);
        classes
            .entry(key)
            .or_insert_with(|| match owner {
                Some(n) => class_from_node(n, bytes),
                // Methods outside any type declaration.
                None => ClassDecl {
                    name: String::new(),
                    line,
                    methods: Vec::new(),
                },
            })
            .methods
            .push(method);
    }

    Ok(DeclarationTree {
        classes: classes.into_values().collect(),
    })
}

fn class_from_node(node: Node, source: &[u8]) -> ClassDecl {
    let name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source).ok())
        .unwrap_or("")
        .to_string();
    ClassDecl {
        name,
        line: node.start_position().row + 1,
        methods: Vec::new(),
    }
}

fn method_from_node(node: Node, source: &[u8]) -> MethodDecl {
    let name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source).ok())
        .unwrap_or("")
        .to_string();

    let mut return_type = node
        .child_by_field_name("type")
        .map(|n| normalize_type(n.utf8_text(source).unwrap_or("")))
        .unwrap_or_else(|| "void".to_string());
    // Legacy `int f()[]` form.
    if let Some(dims) = node.child_by_field_name("dimensions") {
        return_type.push_str(&normalize_type(dims.utf8_text(source).unwrap_or("")));
    }

    let mut params = Vec::new();
    if let Some(list) = node.child_by_field_name("parameters") {
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if let Some(ty) = parameter_type(param, source) {
                params.push(ty);
            }
        }
    }

    MethodDecl {
        name,
        params,
        return_type,
        line: node.start_position().row + 1,
    }
}

/// Canonical type of a formal parameter, or `None` for receiver parameters.
fn parameter_type(param: Node, source: &[u8]) -> Option<String> {
    match param.kind() {
        "formal_parameter" => {
            let mut ty = normalize_type(param.child_by_field_name("type")?.utf8_text(source).ok()?);
            // C-style `int values[]`.
            if let Some(dims) = param.child_by_field_name("dimensions") {
                ty.push_str(&normalize_type(dims.utf8_text(source).unwrap_or("")));
            }
            Some(ty)
        }
        "spread_parameter" => {
            let mut cursor = param.walk();
            let type_node = param
                .named_children(&mut cursor)
                .find(|n| n.kind() != "modifiers")?;
            let mut ty = normalize_type(type_node.utf8_text(source).ok()?);
            ty.push_str("[]");
            Some(ty)
        }
        _ => None,
    }
}

/// Remove all whitespace so `int [ ]` and `int[]` compare equal.
pub fn normalize_type(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// The nearest class, interface, enum or record containing `node`.
pub fn enclosing_type(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if TYPE_KINDS.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}
