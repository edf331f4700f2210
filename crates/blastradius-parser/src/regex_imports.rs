//! Regex-based import detection for languages whose import syntax is
//! cheaper to recognize lexically than to pull out of a full parse tree
//! (§4.D point 3): C `#include`, shell `source`/`.`, and R `source()`.
//!
//! Each detector runs over comment-and-string-stripped text so that an
//! `#include` mentioned inside a string literal or a comment is not
//! mistaken for a real one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extractor::ImportSpec;

static C_INCLUDE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)^\s*#\s*include\s*[<"]([^">]+)[">]"#).unwrap());
static SHELL_SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*(?:source|\.)\s+["']?([^\s"']+)["']?"#).unwrap());
static R_SOURCE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)\bsource\s*\(\s*["']([^"']+)["']"#).unwrap());

/// Strip `//` and `/* */` comments and the contents of string literals,
/// replacing them with spaces so byte offsets (hence line numbers) are
/// preserved.
fn strip_c_comments_and_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                out.push(' ');
                i += 1;
            }
        } else if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            out.push(' ');
            out.push(' ');
            i += 2;
            while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                out.push(if bytes[i] == b'\n' { '\n' } else { ' ' });
                i += 1;
            }
            if i < bytes.len() {
                out.push(' ');
                out.push(' ');
                i += 2;
            }
        } else if bytes[i] == b'"' {
            out.push('"');
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' {
                out.push(if bytes[i] == b'\n' { '\n' } else { ' ' });
                i += 1;
            }
            if i < bytes.len() {
                out.push('"');
                i += 1;
            }
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

fn line_of_byte(text: &str, byte_offset: usize) -> u32 {
    text.as_bytes()[..byte_offset.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u32
}

fn detect(text: &str, stripped: &str, pattern: &Regex) -> Vec<ImportSpec> {
    pattern
        .captures_iter(stripped)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            Some(ImportSpec {
                raw: m.as_str().to_string(),
                line: line_of_byte(text, m.start()),
            })
        })
        .collect()
}

pub fn detect_c_includes(text: &str) -> Vec<ImportSpec> {
    let stripped = strip_c_comments_and_strings(text);
    C_INCLUDE
        .captures_iter(&stripped)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            Some(ImportSpec {
                raw: m.as_str().to_string(),
                line: line_of_byte(text, m.start()),
            })
        })
        .collect()
}

pub fn detect_shell_sources(text: &str) -> Vec<ImportSpec> {
    detect(text, text, &SHELL_SOURCE)
}

pub fn detect_r_sources(text: &str) -> Vec<ImportSpec> {
    detect(text, text, &R_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_angle_and_quoted_includes() {
        let specs = detect_c_includes("#include <stdio.h>\n#include \"local.h\"\n");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].raw, "stdio.h");
        assert_eq!(specs[1].raw, "local.h");
    }

    #[test]
    fn ignores_include_inside_comment() {
        let specs = detect_c_includes("// #include <fake.h>\n#include <real.h>\n");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].raw, "real.h");
    }

    #[test]
    fn finds_shell_source_and_dot() {
        let specs = detect_shell_sources("source ./lib.sh\n. ./other.sh\n");
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn finds_r_source_call() {
        let specs = detect_r_sources("source(\"helpers.R\")\n");
        assert_eq!(specs[0].raw, "helpers.R");
    }
}
