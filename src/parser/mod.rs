//! Java parser front-end.
//!
//! This module provides:
//! - `parse`: source text to a `ParsedSource` (tree + declarations) or a
//!   `SyntaxFailure`
//! - `DeclarationTree`: the classes and method signatures found in a file
//! - Tree-sitter queries for Java in `java`

use serde::Serialize;
use thiserror::Error;

pub mod java;

/// A method signature as declared in the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDecl {
    pub name: String,
    /// Parameter types with whitespace removed; arrays spelled `T[]`.
    pub params: Vec<String>,
    pub return_type: String,
    /// Line number (1-indexed)
    pub line: usize,
}

/// A class, interface or enum and the methods declared directly in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDecl {
    pub name: String,
    pub line: usize,
    pub methods: Vec<MethodDecl>,
}

/// Classes and methods discovered in one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclarationTree {
    pub classes: Vec<ClassDecl>,
}

impl DeclarationTree {
    /// All methods in all classes, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.classes.iter().flat_map(|c| c.methods.iter())
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// The parser could not build a clean tree.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line}: {message}")]
pub struct SyntaxFailure {
    /// Line number (1-indexed), 0 when unknown.
    pub line: usize,
    pub message: String,
}

impl SyntaxFailure {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A successfully parsed source file.
///
/// The tree-sitter tree is kept so rule checks can run their own queries
/// without parsing again.
pub struct ParsedSource {
    pub tree: tree_sitter::Tree,
    pub source: String,
    pub declarations: DeclarationTree,
}

impl ParsedSource {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Run a query over the whole tree and return `(capture name, node)` pairs
    /// in match order.
    pub fn captures(&self, query: &str) -> anyhow::Result<Vec<(String, tree_sitter::Node<'_>)>> {
        java::run_query(&self.tree, self.source.as_bytes(), query)
    }
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource")
            .field("declarations", &self.declarations)
            .finish_non_exhaustive()
    }
}

/// Parse Java source.
///
/// Any failure inside the grammar parser is reported as a `SyntaxFailure`;
/// callers never see another error type.
pub fn parse(source: &str) -> Result<ParsedSource, SyntaxFailure> {
    let tree = java::parse_tree(source)
        .map_err(|e| SyntaxFailure::new(0, format!("parser error: {}", e)))?;

    if let Some(failure) = java::first_syntax_error(&tree, source) {
        return Err(failure);
    }

    let declarations = java::extract_declarations(&tree, source)
        .map_err(|e| SyntaxFailure::new(0, format!("parser error: {}", e)))?;

    Ok(ParsedSource {
        tree,
        source: source.to_string(),
        declarations,
    })
}
