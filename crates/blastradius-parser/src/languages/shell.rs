use blastradius_core::NodeKind;
use tree_sitter::{Node, TreeCursor};

use crate::extractor::{CallSite, Definition, ExtractionResult, LanguageExtractor, ParsedFile};

/// Shell function definitions and command invocations. `source`/`.` imports
/// are handled by the regex-based detector (§4.D), not here: bash's grammar
/// represents them as ordinary commands indistinguishable from any other
/// invocation without a dedicated keyword check, and the reference design
/// keeps that check in one place shared with C and R.
pub struct ShellExtractor;

impl LanguageExtractor for ShellExtractor {
    fn extract(&self, parsed: &ParsedFile) -> ExtractionResult {
        let mut collector = Collector::new(parsed.source);
        let mut cursor = parsed.tree.walk();
        collector.walk(&mut cursor, 0);
        collector.result
    }
}

struct Collector<'a> {
    source: &'a str,
    result: ExtractionResult,
}

impl<'a> Collector<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            result: ExtractionResult::default(),
        }
    }

    fn text(&self, node: &Node) -> String {
        node.utf8_text(self.source.as_bytes()).unwrap_or("").to_string()
    }

    fn walk(&mut self, cursor: &mut TreeCursor<'_>, func_depth: u32) {
        let node = cursor.node();

        match node.kind() {
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if func_depth == 0 {
                        let bare_name = self.text(&name_node);
                        self.result.definitions.push(Definition {
                            kind: NodeKind::Func,
                            name: bare_name.clone(),
                            bare_name,
                            parent_class: None,
                            start_line: node.start_position().row as u32,
                            start_char: node.start_position().column as u32,
                            end_line: node.end_position().row as u32,
                            end_char: node.end_position().column as u32,
                        });
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk_children(&body, func_depth + 1);
                    }
                    return;
                }
            }
            "command" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let cmd = self.text(&name_node);
                    if cmd != "source" && cmd != "." {
                        self.result.call_sites.push(CallSite {
                            line: name_node.start_position().row as u32,
                            char: name_node.start_position().column as u32,
                        });
                    }
                }
            }
            _ => {}
        }

        self.walk_children(&node, func_depth);
    }

    fn walk_children(&mut self, node: &Node, func_depth: u32) {
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                self.walk(&mut cursor, func_depth);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_registry::with_thread_local_parser;
    use blastradius_core::Language;

    fn extract(source: &str) -> ExtractionResult {
        with_thread_local_parser(Language::Shell, |parser| {
            let tree = parser.parse(source, None).unwrap();
            ShellExtractor.extract(&ParsedFile { tree, source })
        })
        .unwrap()
    }

    #[test]
    fn function_definition_is_captured() {
        let r = extract("foo() {\n  bar\n}\n");
        assert_eq!(r.definitions.len(), 1);
        assert_eq!(r.definitions[0].bare_name, "foo");
        assert_eq!(r.call_sites.len(), 1);
    }

    #[test]
    fn source_command_is_not_a_call_site() {
        let r = extract("source ./lib.sh\n");
        assert!(r.call_sites.is_empty());
    }
}
