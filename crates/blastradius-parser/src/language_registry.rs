//! Maps recognized languages to tree-sitter grammars and builds parsers.

use std::cell::RefCell;
use std::collections::HashMap;

use blastradius_core::Language;
use tree_sitter::Parser;

fn grammar_for(language: Language) -> Option<tree_sitter::Language> {
    Some(match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        Language::C => tree_sitter_cpp::LANGUAGE.into(),
        Language::Shell => tree_sitter_bash::LANGUAGE.into(),
        _ => return None,
    })
}

/// Builds a `tree_sitter::Parser` for a given language.
///
/// Grammars are process-global and immutable (per §9); parsers themselves
/// are cheap to build and are cached thread-local by [`thread_local_parser`]
/// so the orchestrator never reconstructs one per file on the same thread.
pub fn create_parser(language: Language) -> Option<Parser> {
    let grammar = grammar_for(language)?;
    let mut parser = Parser::new();
    parser.set_language(&grammar).ok()?;
    Some(parser)
}

thread_local! {
    static PARSERS: RefCell<HashMap<Language, Parser>> = RefCell::new(HashMap::new());
}

/// Run `f` with a thread-local, lazily constructed parser for `language`.
/// Returns `None` if `language` has no tree-sitter grammar wired up.
pub fn with_thread_local_parser<R>(
    language: Language,
    f: impl FnOnce(&mut Parser) -> R,
) -> Option<R> {
    PARSERS.with(|cell| {
        let mut map = cell.borrow_mut();
        let parser = match map.get_mut(&language) {
            Some(p) => p,
            None => {
                let p = create_parser(language)?;
                map.insert(language, p);
                map.get_mut(&language).unwrap()
            }
        };
        Some(f(parser))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_parsers_for_every_tree_sitter_language() {
        for lang in [
            Language::Python,
            Language::TypeScript,
            Language::Go,
            Language::Rust,
            Language::Java,
            Language::Ruby,
            Language::C,
            Language::Shell,
        ] {
            assert!(create_parser(lang).is_some(), "missing grammar for {lang}");
        }
    }

    #[test]
    fn r_has_no_grammar() {
        assert!(create_parser(Language::R).is_none());
    }
}
