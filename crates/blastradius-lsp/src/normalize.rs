//! Normalizes `textDocument/definition` responses, which per the LSP spec
//! may be a single `Location`, a `LocationLink`, or an array of either, into
//! a flat list of `{uri, range}` pairs (§4.C).

use lsp_types::{Range, Url};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLocation {
    pub uri: Url,
    pub range: Range,
}

/// Parse one candidate (a JSON object that should be a `Location` or
/// `LocationLink`). Missing or ill-typed fields cause this single candidate
/// to be skipped rather than failing the whole call (§4.C).
fn parse_one(value: &Value) -> Option<NormalizedLocation> {
    let uri_str = value
        .get("uri")
        .and_then(Value::as_str)
        .or_else(|| value.get("targetUri").and_then(Value::as_str))?;
    let uri = Url::parse(uri_str).ok()?;

    let range_value = value
        .get("range")
        .or_else(|| value.get("targetSelectionRange"))
        .or_else(|| value.get("targetRange"))?;
    let range: Range = serde_json::from_value(range_value.clone()).ok()?;

    Some(NormalizedLocation { uri, range })
}

pub fn normalize_definition_response(value: &Value) -> Vec<NormalizedLocation> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(parse_one).collect(),
        Value::Object(_) => parse_one(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_a_single_location() {
        let v = json!({
            "uri": "file:///a.py",
            "range": {"start": {"line": 1, "character": 0}, "end": {"line": 1, "character": 3}}
        });
        let locs = normalize_definition_response(&v);
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].range.start.line, 1);
    }

    #[test]
    fn normalizes_an_array_of_location_links() {
        let v = json!([
            {"targetUri": "file:///a.py", "targetSelectionRange": {"start": {"line": 2, "character": 0}, "end": {"line": 2, "character": 1}}, "targetRange": {"start": {"line": 2, "character": 0}, "end": {"line": 4, "character": 1}}}
        ]);
        let locs = normalize_definition_response(&v);
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].range.start.line, 2);
    }

    #[test]
    fn skips_malformed_candidates_without_failing() {
        let v = json!([{"uri": "file:///a.py"}, {"not": "a location"}]);
        let locs = normalize_definition_response(&v);
        assert!(locs.is_empty());
    }

    #[test]
    fn null_response_normalizes_to_empty() {
        assert!(normalize_definition_response(&Value::Null).is_empty());
    }
}
