use blastradius_core::NodeKind;
use tree_sitter::{Node, TreeCursor};

use crate::extractor::{CallSite, Definition, ExtractionResult, LanguageExtractor, ParsedFile};

/// C/C++ definitions and call sites. Import edges are *not* produced here:
/// `#include` resolution is handled by the regex-based detector in
/// `regex_imports.rs` per §4.D, even though this grammar could in principle
/// surface `preproc_include` nodes.
pub struct CExtractor;

impl LanguageExtractor for CExtractor {
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

    /// Unwrap `pointer_declarator`/`function_declarator` to the innermost
    /// `identifier` naming the function or struct.
    fn declarator_name<'t>(&self, node: &'t Node) -> Option<Node<'t>> {
        let mut current = *node;
        loop {
            match current.kind() {
                "identifier" | "field_identifier" => return Some(current),
                "pointer_declarator" | "function_declarator" | "parenthesized_declarator" => {
                    current = current.child_by_field_name("declarator")?;
                }
                _ => return None,
            }
        }
    }

    fn walk(&mut self, cursor: &mut TreeCursor<'_>, func_depth: u32) {
        let node = cursor.node();

        match node.kind() {
            "function_definition" => {
                if let Some(declarator) = node.child_by_field_name("declarator") {
                    if let Some(name_node) = self.declarator_name(&declarator) {
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
            }
            "struct_specifier" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if func_depth == 0 && node.child_by_field_name("body").is_some() {
                        let bare_name = self.text(&name_node);
                        self.result.definitions.push(Definition {
                            kind: NodeKind::Class,
                            name: bare_name.clone(),
                            bare_name,
                            parent_class: None,
                            start_line: node.start_position().row as u32,
                            start_char: node.start_position().column as u32,
                            end_line: node.end_position().row as u32,
                            end_char: node.end_position().column as u32,
                        });
                    }
                }
            }
            "call_expression" => {
                if let Some(func) = node.child_by_field_name("function") {
                    if func.kind() == "identifier" {
                        self.result.call_sites.push(CallSite {
                            line: func.start_position().row as u32,
                            char: func.start_position().column as u32,
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
        with_thread_local_parser(Language::C, |parser| {
            let tree = parser.parse(source, None).unwrap();
            CExtractor.extract(&ParsedFile { tree, source })
        })
        .unwrap()
    }

    #[test]
    fn function_and_call_are_captured() {
        let r = extract("int add(int a, int b) { return helper(a, b); }\n");
        assert_eq!(r.definitions.len(), 1);
        assert_eq!(r.definitions[0].bare_name, "add");
        assert_eq!(r.call_sites.len(), 1);
    }

    #[test]
    fn struct_with_body_is_a_class() {
        let r = extract("struct Point { int x; int y; };\n");
        assert_eq!(r.definitions[0].kind, NodeKind::Class);
    }
}
