//! Maps a language to the language-server command used to start a client,
//! and probes `PATH` for the server binary the way the reference
//! `shutil.which` check does (§4.C Session health).

use blastradius_core::Language;

/// The command+args used to launch the language server for `language`, if
/// one is known. Availability at runtime is still gated by [`probe`].
pub fn server_command(language: Language) -> Option<Vec<String>> {
    let argv: &[&str] = match language {
        Language::Python => &["pylsp"],
        Language::TypeScript => &["typescript-language-server", "--stdio"],
        Language::Go => &["gopls"],
        Language::Rust => &["rust-analyzer"],
        Language::Java => &["jdtls"],
        Language::Ruby => &["solargraph", "stdio"],
        Language::C => &["clangd"],
        _ => return None,
    };
    Some(argv.iter().map(|s| s.to_string()).collect())
}

/// `true` if the first element of `cmd` resolves to an executable on `PATH`.
pub fn probe(cmd: &[String]) -> bool {
    let Some(binary) = cmd.first() else {
        return false;
    };
    which(binary).is_some()
}

fn which(binary: &str) -> Option<std::path::PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(binary);
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_languages_have_a_command() {
        assert!(server_command(Language::Python).is_some());
        assert!(server_command(Language::Rust).is_some());
    }

    #[test]
    fn unmapped_language_has_no_command() {
        assert!(server_command(Language::R).is_none());
    }

    #[test]
    fn probe_rejects_nonexistent_binary() {
        assert!(!probe(&["definitely-not-a-real-binary-xyz".to_string()]));
    }
}
