pub mod c;
pub mod go;
pub mod java;
pub mod python;
pub mod ruby;
pub mod rust;
pub mod shell;
pub mod typescript;

use blastradius_core::Language;

use crate::extractor::LanguageExtractor;

/// Look up the tree-sitter extractor for a language, if one exists.
/// R has no tree-sitter grammar (§6) and is excluded.
pub fn extractor_for(language: Language) -> Option<Box<dyn LanguageExtractor>> {
    Some(match language {
        Language::Python => Box::new(python::PythonExtractor),
        Language::TypeScript => Box::new(typescript::TypeScriptExtractor),
        Language::Go => Box::new(go::GoExtractor),
        Language::Rust => Box::new(rust::RustExtractor),
        Language::Java => Box::new(java::JavaExtractor),
        Language::Ruby => Box::new(ruby::RubyExtractor),
        Language::C => Box::new(c::CExtractor),
        Language::Shell => Box::new(shell::ShellExtractor),
        _ => return None,
    })
}
