use blastradius_core::NodeKind;
use tree_sitter::{Node, TreeCursor};

use crate::extractor::{CallSite, Definition, ExtractionResult, ImportSpec, LanguageExtractor, ParsedFile};

pub struct GoExtractor;

impl LanguageExtractor for GoExtractor {
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

    /// Go has no classes; struct types stand in for CLASS nodes so methods
    /// with a receiver of that type get a CONTAINS parent.
    fn receiver_type_name(&self, receiver: &Node) -> Option<String> {
        let mut cursor = receiver.walk();
        for param in receiver.named_children(&mut cursor) {
            if param.kind() == "parameter_declaration" {
                if let Some(ty) = param.child_by_field_name("type") {
                    let inner = if ty.kind() == "pointer_type" {
                        ty.named_child(0)?
                    } else {
                        ty
                    };
                    return Some(self.text(&inner));
                }
            }
        }
        None
    }

    fn walk(&mut self, cursor: &mut TreeCursor<'_>, func_depth: u32) {
        let node = cursor.node();

        match node.kind() {
            "function_declaration" => {
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
            "method_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    if func_depth == 0 {
                        let bare_name = self.text(&name_node);
                        let parent_class = node
                            .child_by_field_name("receiver")
                            .and_then(|r| self.receiver_type_name(&r));
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
                        self.walk_children(&body, func_depth + 1);
                    }
                    return;
                }
            }
            "type_spec" => {
                if let (Some(name_node), Some(ty)) =
                    (node.child_by_field_name("name"), node.child_by_field_name("type"))
                {
                    if ty.kind() == "struct_type" && func_depth == 0 {
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
            "import_spec" => {
                if let Some(path) = node.child_by_field_name("path") {
                    self.result.import_specs.push(ImportSpec {
                        raw: self.text(&path).trim_matches('"').to_string(),
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

        self.walk_children(&node, func_depth);
    }

    fn final_identifier<'t>(&self, func: &'t Node) -> Option<Node<'t>> {
        match func.kind() {
            "identifier" => Some(*func),
            "selector_expression" => func.child_by_field_name("field"),
            _ => None,
        }
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
        with_thread_local_parser(Language::Go, |parser| {
            let tree = parser.parse(source, None).unwrap();
            GoExtractor.extract(&ParsedFile { tree, source })
        })
        .unwrap()
    }

    #[test]
    fn struct_methods_are_qualified_by_receiver_type() {
        let src = "package p\ntype T struct{}\nfunc (t *T) M() {}\n";
        let r = extract(src);
        let m = r.definitions.iter().find(|d| d.bare_name == "M").unwrap();
        assert_eq!(m.parent_class.as_deref(), Some("T"));
        assert_eq!(m.name, "T.M");
    }

    #[test]
    fn import_path_is_captured() {
        let r = extract("package p\nimport \"fmt\"\n");
        assert_eq!(r.import_specs[0].raw, "fmt");
    }
}
