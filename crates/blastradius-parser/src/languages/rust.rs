use blastradius_core::NodeKind;
use tree_sitter::{Node, TreeCursor};

use crate::extractor::{CallSite, Definition, ExtractionResult, ImportSpec, LanguageExtractor, ParsedFile};

pub struct RustExtractor;

impl LanguageExtractor for RustExtractor {
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
            "struct_item" | "enum_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if func_depth == 0 {
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
            "impl_item" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    let type_name = self.text(&ty);
                    if let Some(body) = node.child_by_field_name("body") {
                        let mut nested = class_stack.to_vec();
                        nested.push(type_name);
                        self.walk_children(&body, &nested, func_depth);
                    }
                    return;
                }
            }
            "function_item" => {
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
            "use_declaration" => {
                if let Some(arg) = node.child_by_field_name("argument") {
                    self.result.import_specs.push(ImportSpec {
                        raw: self.text(&arg),
                        line: node.start_position().row as u32,
                    });
                }
            }
            "call_expression" => {
                if let Some(func) = node.child_by_field_name("function") {
                    if let Some(ident) = self.final_identifier(&func) {
                        self.result.call_sites.push(CallSite {
                            line: ident.start_position().row as u32,
                            char: ident.start_position().column as u32,
                        });
                    }
                }
            }
            _ => {}
        }

        self.walk_children(&node, class_stack, func_depth);
    }

    fn final_identifier<'t>(&self, func: &'t Node) -> Option<Node<'t>> {
        match func.kind() {
            "identifier" => Some(*func),
            "field_expression" => func.child_by_field_name("field"),
            "scoped_identifier" => func.child_by_field_name("name"),
            _ => None,
        }
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
        with_thread_local_parser(Language::Rust, |parser| {
            let tree = parser.parse(source, None).unwrap();
            RustExtractor.extract(&ParsedFile { tree, source })
        })
        .unwrap()
    }

    #[test]
    fn impl_methods_are_qualified_by_type() {
        let r = extract("struct Foo;\nimpl Foo {\n    fn bar(&self) {}\n}\n");
        let m = r.definitions.iter().find(|d| d.bare_name == "bar").unwrap();
        assert_eq!(m.parent_class.as_deref(), Some("Foo"));
        assert_eq!(m.name, "Foo.bar");
    }

    #[test]
    fn use_declaration_is_captured() {
        let r = extract("use std::collections::HashMap;\n");
        assert_eq!(r.import_specs.len(), 1);
    }
}
