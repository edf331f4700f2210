use blastradius_core::NodeKind;
use tree_sitter::{Node, TreeCursor};

use crate::extractor::{CallSite, Definition, ExtractionResult, LanguageExtractor, ParsedFile};

pub struct PythonExtractor;

impl LanguageExtractor for PythonExtractor {
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

    fn child_by_kind<'t>(&self, node: &'t Node, kind: &str) -> Option<Node<'t>> {
        let mut cursor = node.walk();
        node.children(&mut cursor).find(|c| c.kind() == kind)
    }

    /// First child whose kind is any of `kinds`, in tree order — unlike
    /// chaining `child_by_kind(...).or_else(...)`, this doesn't let an
    /// earlier-listed-but-later-positioned kind win over one that actually
    /// appears first in the node's children (e.g. `relative_import` before
    /// the `dotted_name` import-list item in `from .b import b`).
    fn child_by_kinds<'t>(&self, node: &'t Node, kinds: &[&str]) -> Option<Node<'t>> {
        let mut cursor = node.walk();
        node.children(&mut cursor).find(|c| kinds.contains(&c.kind()))
    }

    /// `class_stack` holds the dot-joined qualified names of enclosing
    /// classes (outermost first); `func_depth` is the number of enclosing
    /// function scopes (only function bodies, not classes).
    fn walk(&mut self, cursor: &mut TreeCursor<'_>, class_stack: &[String], func_depth: u32) {
        let node = cursor.node();

        match node.kind() {
            "function_definition" => {
                if let Some(name_node) = self.child_by_kind(&node, "identifier") {
                    let bare_name = self.text(&name_node);
                    if func_depth == 0 {
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
            "class_definition" => {
                if let Some(name_node) = self.child_by_kind(&node, "identifier") {
                    let bare_name = self.text(&name_node);
                    if func_depth == 0 {
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
            "import_statement" => {
                if let Some(names) = self.child_by_kind(&node, "dotted_name").or_else(|| self.child_by_kind(&node, "aliased_import")) {
                    self.result.import_specs.push(crate::extractor::ImportSpec {
                        raw: self.text(&names),
                        line: node.start_position().row as u32,
                    });
                }
            }
            "import_from_statement" => {
                if let Some(module) = self.child_by_kinds(&node, &["relative_import", "dotted_name"]) {
                    self.result.import_specs.push(crate::extractor::ImportSpec {
                        raw: self.text(&module),
                        line: node.start_position().row as u32,
                    });
                }
            }
            "call" => {
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

    /// For `a.b.c`, returns the node for the final `c` identifier — the
    /// position used for LSP `definition` lookups (§4.B).
    fn final_identifier<'t>(&self, func: &'t Node) -> Option<Node<'t>> {
        match func.kind() {
            "identifier" => Some(*func),
            "attribute" => func.child_by_field_name("attribute"),
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
        with_thread_local_parser(Language::Python, |parser| {
            let tree = parser.parse(source, None).unwrap();
            PythonExtractor.extract(&ParsedFile { tree, source })
        })
        .unwrap()
    }

    #[test]
    fn top_level_function_is_emitted() {
        let r = extract("def foo():\n    pass\n");
        assert_eq!(r.definitions.len(), 1);
        assert_eq!(r.definitions[0].bare_name, "foo");
        assert_eq!(r.definitions[0].kind, NodeKind::Func);
    }

    #[test]
    fn nested_function_is_not_emitted() {
        let r = extract("def outer():\n    def inner():\n        pass\n    inner()\n");
        assert_eq!(r.definitions.len(), 1);
        assert_eq!(r.definitions[0].bare_name, "outer");
        // the call to inner() is still recorded as a call site
        assert_eq!(r.call_sites.len(), 1);
    }

    #[test]
    fn method_name_is_qualified_by_parent_class() {
        let r = extract("class Foo:\n    def bar(self):\n        pass\n");
        assert_eq!(r.definitions.len(), 2);
        let method = r.definitions.iter().find(|d| d.bare_name == "bar").unwrap();
        assert_eq!(method.name, "Foo.bar");
        assert_eq!(method.parent_class.as_deref(), Some("Foo"));
    }

    #[test]
    fn nested_class_is_emitted_with_parent_class() {
        let r = extract("class Outer:\n    class Inner:\n        pass\n");
        let inner = r.definitions.iter().find(|d| d.bare_name == "Inner").unwrap();
        assert_eq!(inner.parent_class.as_deref(), Some("Outer"));
        assert_eq!(inner.name, "Outer.Inner");
    }

    #[test]
    fn relative_import_is_captured() {
        let r = extract("from .b import b\n");
        assert_eq!(r.import_specs.len(), 1);
        assert_eq!(r.import_specs[0].raw, ".b");
    }

    #[test]
    fn empty_file_has_no_definitions() {
        let r = extract("");
        assert!(r.definitions.is_empty());
        assert!(r.import_specs.is_empty());
        assert!(r.call_sites.is_empty());
    }
}
