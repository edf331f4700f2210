//! Canvas directory resolution (§4.H): `<project_dir>/.codecanvas` by
//! default, overridable via `CANVAS_ARTIFACT_DIR`.

use std::path::{Path, PathBuf};

use blastradius_core::BlastradiusConfig;

const DEFAULT_DIR_NAME: &str = ".codecanvas";

/// Resolve the artifact directory for `project_dir`, honoring
/// `config.artifact_dir_override` (absolute or relative to `project_dir`).
/// Does not create the directory; callers create it lazily on first write.
pub fn canvas_dir(project_dir: &Path, config: &BlastradiusConfig) -> PathBuf {
    match &config.artifact_dir_override {
        Some(raw) => {
            let override_path = Path::new(raw);
            if override_path.is_absolute() {
                override_path.to_path_buf()
            } else {
                project_dir.join(override_path)
            }
        }
        None => project_dir.join(DEFAULT_DIR_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_canvas_dir_is_dotcodecanvas() {
        let cfg = BlastradiusConfig::default();
        let dir = canvas_dir(Path::new("/repo"), &cfg);
        assert_eq!(dir, PathBuf::from("/repo/.codecanvas"));
    }

    #[test]
    fn relative_override_is_joined_with_project_dir() {
        let mut cfg = BlastradiusConfig::default();
        cfg.artifact_dir_override = Some("artifacts".to_string());
        let dir = canvas_dir(Path::new("/repo"), &cfg);
        assert_eq!(dir, PathBuf::from("/repo/artifacts"));
    }

    #[test]
    fn absolute_override_wins_outright() {
        let mut cfg = BlastradiusConfig::default();
        cfg.artifact_dir_override = Some("/var/blastradius".to_string());
        let dir = canvas_dir(Path::new("/repo"), &cfg);
        assert_eq!(dir, PathBuf::from("/var/blastradius"));
    }
}
