use blastradius_core::NodeKind;
use tree_sitter::{Node, TreeCursor};

use crate::extractor::{CallSite, Definition, ExtractionResult, ImportSpec, LanguageExtractor, ParsedFile};

pub struct JavaExtractor;

impl LanguageExtractor for JavaExtractor {
    fn extract(&self, parsed: &ParsedFile) -> ExtractionResult {
        let mut collector = Collector::new(parsed.source);
        let mut cursor = parsed.tree.walk();
        collector.walk(&mut cursor, &[], 0);
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

    fn walk(&mut self, cursor: &mut TreeCursor<'_>, class_stack: &[String], func_depth: u32) {
        let node = cursor.node();

        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if func_depth == 0 {
                        let bare_name = self.text(&name_node);
                        let parent_class = class_stack.last().cloned();
                        let qualified = match &parent_class {
                            Some(p) => format!("{p}.{bare_name}"),
                            None => bare_name.clone(),
                        };
                        self.result.definitions.push(Definition {
                            kind: NodeKind::Class,
                            name: qualified.clone(),
                            bare_name,
                            parent_class,
                            start_line: node.start_position().row as u32,
                            start_char: node.start_position().column as u32,
                            end_line: node.end_position().row as u32,
                            end_char: node.end_position().column as u32,
                        });
                        if let Some(body) = node.child_by_field_name("body") {
                            let mut nested = class_stack.to_vec();
                            nested.push(qualified);
                            self.walk_children(&body, &nested, func_depth);
                        }
                        return;
                    }
                }
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if func_depth == 0 {
                        let bare_name = self.text(&name_node);
                        let parent_class = class_stack.last().cloned();
                        let qualified = match &parent_class {
                            Some(p) => format!("{p}.{bare_name}"),
                            None => bare_name.clone(),
                        };
                        self.result.definitions.push(Definition {
                            kind: NodeKind::Func,
                            name: qualified,
                            bare_name,
                            parent_class,
                            start_line: node.start_position().row as u32,
                            start_char: node.start_position().column as u32,
                            end_line: node.end_position().row as u32,
                            end_char: node.end_position().column as u32,
                        });
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk_children(&body, class_stack, func_depth + 1);
                    }
                    return;
                }
            }
            "import_declaration" => {
                if let Some(path) = node.named_child(0) {
                    self.result.import_specs.push(ImportSpec {
                        raw: self.text(&path),
                        line: node.start_position().row as u32,
                    });
                }
            }
            "method_invocation" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    self.result.call_sites.push(CallSite {
                        line: name_node.start_position().row as u32,
                        char: name_node.start_position().column as u32,
                    });
                }
            }
            _ => {}
        }

        self.walk_children(&node, class_stack, func_depth);
    }

    fn walk_children(&mut self, node: &Node, class_stack: &[String], func_depth: u32) {
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                self.walk(&mut cursor, class_stack, func_depth);
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
        with_thread_local_parser(Language::Java, |parser| {
            let tree = parser.parse(source, None).unwrap();
            JavaExtractor.extract(&ParsedFile { tree, source })
        })
        .unwrap()
    }

    #[test]
    fn methods_are_qualified_by_class() {
        let r = extract("class Foo {\n  void bar() {\n    baz();\n  }\n}\n");
        let m = r.definitions.iter().find(|d| d.bare_name == "bar").unwrap();
        assert_eq!(m.name, "Foo.bar");
        assert_eq!(r.call_sites.len(), 1);
    }
}
