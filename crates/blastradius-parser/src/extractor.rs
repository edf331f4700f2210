//! The three tree-sitter extraction contracts of §4.B: `definitions`,
//! `import_specs`, and `call_sites`, all produced from a single parse.

use blastradius_core::NodeKind;

/// A class or function definition surfaced by a language extractor.
///
/// Only top-level definitions relative to any enclosing function are
/// emitted: nested functions inside a function are not symbols, but nested
/// classes inside classes are (with `parent_class` set).
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub kind: NodeKind,
    /// Qualified name: `ParentClass.bare_name` for methods, `bare_name` otherwise.
    pub name: String,
    pub bare_name: String,
    pub parent_class: Option<String>,
    pub start_line: u32,
    pub start_char: u32,
    pub end_line: u32,
    pub end_char: u32,
}

/// A raw import token, not yet resolved to a module label (resolution is
/// the orchestrator's job, §4.D).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub raw: String,
    pub line: u32,
}

/// The position of the final identifier of a call expression, e.g. for
/// `a.b.c()` the position of `c`. This is the position fed to LSP
/// `definition` lookups by the call-graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub line: u32,
    pub char: u32,
}

/// The output of a single tree-sitter traversal over a parsed file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub definitions: Vec<Definition>,
    pub import_specs: Vec<ImportSpec>,
    pub call_sites: Vec<CallSite>,
}

/// A parsed file: source bytes plus the tree-sitter tree built over them.
/// All three extractors reuse this single parse (§4.B).
pub struct ParsedFile<'a> {
    pub tree: tree_sitter::Tree,
    pub source: &'a str,
}

/// Per-language AST extractor. Implementations walk the tree once and
/// collect all three outputs in a single traversal.
pub trait LanguageExtractor {
    fn extract(&self, parsed: &ParsedFile) -> ExtractionResult;
}
