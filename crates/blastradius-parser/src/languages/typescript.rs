use blastradius_core::NodeKind;
use tree_sitter::{Node, TreeCursor};

use crate::extractor::{CallSite, Definition, ExtractionResult, ImportSpec, LanguageExtractor, ParsedFile};

pub struct TypeScriptExtractor;

impl LanguageExtractor for TypeScriptExtractor {
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

    fn push_definition(&mut self, kind: NodeKind, bare_name: String, parent_class: Option<String>, node: &Node) {
        let name = match &parent_class {
            Some(p) => format!("{p}.{bare_name}"),
            None => bare_name.clone(),
        };
        self.result.definitions.push(Definition {
            kind,
            name,
            bare_name,
            parent_class,
            start_line: node.start_position().row as u32,
            start_char: node.start_position().column as u32,
            end_line: node.end_position().row as u32,
            end_char: node.end_position().column as u32,
        });
    }

    fn walk(&mut self, cursor: &mut TreeCursor<'_>, class_stack: &[String], func_depth: u32) {
        let node = cursor.node();

        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let bare_name = self.text(&name_node);
                    if func_depth == 0 {
                        self.push_definition(NodeKind::Func, bare_name, class_stack.last().cloned(), &node);
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk_children(&body, class_stack, func_depth + 1);
                    }
                    return;
                }
            }
            "class_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let bare_name = self.text(&name_node);
                    if func_depth == 0 {
                        let parent_class = class_stack.last().cloned();
                        let qualified = match &parent_class {
                            Some(p) => format!("{p}.{bare_name}"),
                            None => bare_name.clone(),
                        };
                        self.push_definition(NodeKind::Class, bare_name, parent_class, &node);
                        if let Some(body) = node.child_by_field_name("body") {
                            let mut nested = class_stack.to_vec();
                            nested.push(qualified);
                            self.walk_children(&body, &nested, func_depth);
                        }
                        return;
                    }
                }
            }
            "method_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let bare_name = self.text(&name_node);
                    if func_depth == 0 {
                        self.push_definition(NodeKind::Func, bare_name, class_stack.last().cloned(), &node);
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk_children(&body, class_stack, func_depth + 1);
                    }
                    return;
                }
            }
            // const foo = () => {} / const foo = function() {}
            "variable_declarator" => {
                if let (Some(name_node), Some(value)) =
                    (node.child_by_field_name("name"), node.child_by_field_name("value"))
                {
                    if matches!(value.kind(), "arrow_function" | "function_expression") {
                        let bare_name = self.text(&name_node);
                        if func_depth == 0 {
                            self.push_definition(NodeKind::Func, bare_name, class_stack.last().cloned(), &node);
                        }
                        if let Some(body) = value.child_by_field_name("body") {
                            self.walk_children(&body, class_stack, func_depth + 1);
                        }
                        return;
                    }
                }
            }
            "import_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.result.import_specs.push(ImportSpec {
                        raw: strip_quotes(&self.text(&source)),
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
                    } else if self.text(&func) == "require" {
                        if let Some(args) = node.child_by_field_name("arguments") {
                            if let Some(arg) = args.named_child(0) {
                                if arg.kind() == "string" {
                                    self.result.import_specs.push(ImportSpec {
                                        raw: strip_quotes(&self.text(&arg)),
                                        line: node.start_position().row as u32,
                                    });
                                }
                            }
                        }
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
            "member_expression" => func.child_by_field_name("property"),
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

fn strip_quotes(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_registry::with_thread_local_parser;
    use blastradius_core::Language;

    fn extract(source: &str) -> ExtractionResult {
        with_thread_local_parser(Language::TypeScript, |parser| {
            let tree = parser.parse(source, None).unwrap();
            TypeScriptExtractor.extract(&ParsedFile { tree, source })
        })
        .unwrap()
    }

    #[test]
    fn const_arrow_function_counts_as_function() {
        let r = extract("const foo = () => { bar(); };\n");
        assert_eq!(r.definitions.len(), 1);
        assert_eq!(r.definitions[0].bare_name, "foo");
    }

    #[test]
    fn class_methods_are_qualified() {
        let r = extract("class Foo {\n  bar() {\n    this.baz();\n  }\n}\n");
        let method = r.definitions.iter().find(|d| d.bare_name == "bar").unwrap();
        assert_eq!(method.name, "Foo.bar");
    }

    #[test]
    fn import_and_require_are_both_captured() {
        let r = extract("import { a } from \"./a\";\nconst b = require(\"./b\");\n");
        assert_eq!(r.import_specs.len(), 2);
    }
}
