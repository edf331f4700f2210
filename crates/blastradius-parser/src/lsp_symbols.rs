//! Walk an LSP `textDocument/documentSymbol` response into module-relative
//! CLASS/FUNC definitions (§4.D point 4).
//!
//! `DocumentSymbol.kind` is the numeric `SymbolKind` from the LSP spec;
//! matched directly against raw JSON rather than through a typed enum so a
//! server returning an unrecognized future kind degrades to "skip", not
//! "fail the whole file".

use serde_json::Value;

const KIND_MODULE: i64 = 2;
const KIND_NAMESPACE: i64 = 3;
const KIND_PACKAGE: i64 = 4;
const KIND_CLASS: i64 = 5;
const KIND_METHOD: i64 = 6;
const KIND_CONSTRUCTOR: i64 = 9;
const KIND_ENUM: i64 = 10;
const KIND_INTERFACE: i64 = 11;
const KIND_FUNCTION: i64 = 12;
const KIND_STRUCT: i64 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolNodeKind {
    Class,
    Func,
}

#[derive(Debug, Clone)]
pub struct LspSymbol {
    pub node_kind: SymbolNodeKind,
    /// Dot-joined qualified label from the container qualname, e.g. `Outer.Inner.method`.
    pub qualified_label: String,
    pub bare_name: String,
    /// Qualified label of the enclosing CLASS, if any (used for CONTAINS).
    pub parent_class_label: Option<String>,
    pub start_line: u32,
    pub start_char: u32,
    pub end_line: u32,
    pub end_char: u32,
    /// The identifier line used for function IDs: `selection_range.start.line`
    /// if present, else `range.start.line` (§3).
    pub id_line: u32,
}

fn get_line_char(range: &Value, field: &str) -> Option<(u32, u32)> {
    let pos = range.get(field)?;
    let line = pos.get("line")?.as_u64()? as u32;
    let character = pos.get("character")?.as_u64()? as u32;
    Some((line, character))
}

/// Recursively walk `symbols` (a JSON array of `DocumentSymbol`), collecting
/// CLASS/FUNC definitions with containment-transparent traversal of
/// Module/Namespace/Package containers.
pub fn collect_symbols(symbols: &Value) -> Vec<LspSymbol> {
    let mut out = Vec::new();
    if let Some(items) = symbols.as_array() {
        for item in items {
            walk(item, None, None, &mut out);
        }
    }
    out
}

fn walk(node: &Value, qualname_prefix: Option<&str>, parent_class_label: Option<&str>, out: &mut Vec<LspSymbol>) {
    let Some(name) = node.get("name").and_then(Value::as_str) else {
        return;
    };
    let kind = node.get("kind").and_then(Value::as_i64).unwrap_or(0);
    let range = node.get("range");
    let selection_range = node.get("selectionRange");

    let (start_line, start_char) = range
        .and_then(|r| get_line_char(r, "start"))
        .unwrap_or((0, 0));
    let (end_line, end_char) = range
        .and_then(|r| get_line_char(r, "end"))
        .unwrap_or((start_line, start_char));
    let id_line = selection_range
        .and_then(|r| get_line_char(r, "start"))
        .map(|(l, _)| l)
        .unwrap_or(start_line);

    let qualified_label = match qualname_prefix {
        Some(prefix) => format!("{prefix}.{name}"),
        None => name.to_string(),
    };

    let node_symbol_kind = match kind {
        KIND_CLASS | KIND_STRUCT | KIND_INTERFACE | KIND_ENUM => Some(SymbolNodeKind::Class),
        KIND_FUNCTION | KIND_METHOD | KIND_CONSTRUCTOR => Some(SymbolNodeKind::Func),
        _ => None,
    };

    let mut next_prefix = qualname_prefix.map(str::to_string);
    let mut next_parent_class = parent_class_label.map(str::to_string);

    if let Some(symbol_kind) = node_symbol_kind {
        out.push(LspSymbol {
            node_kind: symbol_kind,
            qualified_label: qualified_label.clone(),
            bare_name: name.to_string(),
            parent_class_label: parent_class_label.map(str::to_string),
            start_line,
            start_char,
            end_line,
            end_char,
            id_line,
        });
        next_prefix = Some(qualified_label.clone());
        if symbol_kind == SymbolNodeKind::Class {
            next_parent_class = Some(qualified_label);
        }
    } else if matches!(kind, KIND_MODULE | KIND_NAMESPACE | KIND_PACKAGE) {
        // Transparent container: descend without emitting a node, but keep
        // the qualname prefix growing for hierarchical display names.
        next_prefix = Some(qualified_label);
    } else {
        // Unrecognized/irrelevant kind (Variable, Field, ...): still walk
        // children in case a server nests functions under a field symbol.
    }

    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            walk(child, next_prefix.as_deref(), next_parent_class.as_deref(), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_top_level_function() {
        let symbols = json!([{
            "name": "foo",
            "kind": KIND_FUNCTION,
            "range": {"start": {"line": 0, "character": 0}, "end": {"line": 2, "character": 0}},
            "selectionRange": {"start": {"line": 0, "character": 4}, "end": {"line": 0, "character": 7}}
        }]);
        let out = collect_symbols(&symbols);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].qualified_label, "foo");
        assert_eq!(out[0].id_line, 0);
    }

    #[test]
    fn class_methods_get_qualified_labels_and_parent() {
        let symbols = json!([{
            "name": "Foo",
            "kind": KIND_CLASS,
            "range": {"start": {"line": 0, "character": 0}, "end": {"line": 5, "character": 0}},
            "selectionRange": {"start": {"line": 0, "character": 6}, "end": {"line": 0, "character": 9}},
            "children": [{
                "name": "bar",
                "kind": KIND_METHOD,
                "range": {"start": {"line": 1, "character": 4}, "end": {"line": 2, "character": 0}},
                "selectionRange": {"start": {"line": 1, "character": 8}, "end": {"line": 1, "character": 11}}
            }]
        }]);
        let out = collect_symbols(&symbols);
        assert_eq!(out.len(), 2);
        let method = out.iter().find(|s| s.bare_name == "bar").unwrap();
        assert_eq!(method.qualified_label, "Foo.bar");
        assert_eq!(method.parent_class_label.as_deref(), Some("Foo"));
    }

    #[test]
    fn module_and_namespace_are_transparent() {
        let symbols = json!([{
            "name": "pkg",
            "kind": KIND_NAMESPACE,
            "range": {"start": {"line": 0, "character": 0}, "end": {"line": 10, "character": 0}},
            "children": [{
                "name": "baz",
                "kind": KIND_FUNCTION,
                "range": {"start": {"line": 1, "character": 0}, "end": {"line": 1, "character": 0}},
                "selectionRange": {"start": {"line": 1, "character": 4}, "end": {"line": 1, "character": 7}}
            }]
        }]);
        let out = collect_symbols(&symbols);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].qualified_label, "pkg.baz");
    }
}
