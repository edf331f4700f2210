//! Merkle leaf/root computation over module contents (§3, §4.H), with
//! stat-reuse leaf caching ported from `graph_meta.py`'s
//! `_leaf_from_existing`.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CONFIG_LEAF_KEY: &str = "\u{0}config";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Leaf {
    pub label: String,
    pub fs_path: String,
    pub mtime_ns: i128,
    pub size: u64,
    pub content_sha256: Option<String>,
    #[serde(default)]
    pub missing: bool,
    pub leaf_hash: String,
}

fn hex(bytes: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(bytes.as_ref());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex digest back to raw bytes, the way `_hash_leaf`/`_merkle_root`
/// decode a stored hex hash before rehashing it as part of a larger payload.
/// Falls back to the raw UTF-8 bytes of `s` if it isn't valid hex.
fn hex_decode(s: &str) -> Vec<u8> {
    if s.len() % 2 != 0 {
        return s.as_bytes().to_vec();
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    for i in (0..s.len()).step_by(2) {
        match u8::from_str_radix(&s[i..i + 2], 16) {
            Ok(byte) => out.push(byte),
            Err(_) => return s.as_bytes().to_vec(),
        }
    }
    out
}

fn stat_signature(path: &Path) -> Option<(i128, u64)> {
    let meta = fs::metadata(path).ok()?;
    let mtime_ns = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i128)
        .unwrap_or(0);
    Some((mtime_ns, meta.len()))
}

/// Reuse `existing`'s cached hash when `fs_path`/`missing`/`mtime_ns`/`size`
/// all agree with the current stat; otherwise rehash from disk.
pub fn compute_leaf(label: &str, fs_path: &str, existing: Option<&Leaf>, always_rehash: bool) -> Leaf {
    let path = Path::new(fs_path);
    let stat = stat_signature(path);

    if !always_rehash {
        if let (Some(existing), Some((mtime_ns, size))) = (existing, stat) {
            if existing.fs_path == fs_path
                && !existing.missing
                && existing.mtime_ns == mtime_ns
                && existing.size == size
            {
                return existing.clone();
            }
        }
    }

    match (stat, fs::read(path)) {
        (Some((mtime_ns, size)), Ok(bytes)) => {
            let content_sha256 = hex(&bytes);
            let mut payload = format!("file\0{label}\0").into_bytes();
            payload.extend(hex_decode(&content_sha256));
            let leaf_hash = hex(payload);
            Leaf {
                label: label.to_string(),
                fs_path: fs_path.to_string(),
                mtime_ns,
                size,
                content_sha256: Some(content_sha256),
                missing: false,
                leaf_hash,
            }
        }
        _ => Leaf {
            label: label.to_string(),
            fs_path: fs_path.to_string(),
            mtime_ns: 0,
            size: 0,
            content_sha256: None,
            missing: true,
            leaf_hash: hex(format!("missing\0{label}")),
        },
    }
}

pub fn config_leaf_hash(canonical_json: &str) -> String {
    hex(format!("config\0{canonical_json}"))
}

fn node_hash(left: &str, right: &str) -> String {
    let mut payload = b"node\0".to_vec();
    payload.extend(hex_decode(left));
    payload.extend(hex_decode(right));
    hex(payload)
}

/// Binary Merkle tree over `(key, leaf_hash)` items sorted ascending by
/// key, plus the config leaf at sentinel key `"\x00config"`. Odd levels
/// duplicate the tail hash.
pub fn merkle_root(leaves: &[Leaf], config_hash: &str) -> String {
    let mut entries: Vec<(&str, &str)> = leaves
        .iter()
        .map(|l| (l.label.as_str(), l.leaf_hash.as_str()))
        .collect();
    entries.push((CONFIG_LEAF_KEY, config_hash));
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut level: Vec<String> = entries.into_iter().map(|(_, hash)| hash.to_string()).collect();
    if level.is_empty() {
        return hex("empty");
    }

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let tail = level.last().cloned().unwrap();
            level.push(tail);
        }
        level = level
            .chunks(2)
            .map(|pair| node_hash(&pair[0], &pair[1]))
            .collect();
    }
    level.into_iter().next().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_produces_missing_leaf() {
        let leaf = compute_leaf("mod_a", "/nonexistent/path/a.py", None, false);
        assert!(leaf.missing);
        assert_eq!(leaf.leaf_hash, hex(format!("missing\0{}", "mod_a")));
    }

    #[test]
    fn stat_reuse_returns_identical_leaf_without_rehash() {
        let f = write_temp("print(1)");
        let path = f.path().to_str().unwrap();
        let first = compute_leaf("mod_a", path, None, false);
        let second = compute_leaf("mod_a", path, Some(&first), false);
        assert_eq!(first, second);
    }

    #[test]
    fn always_rehash_ignores_existing_leaf() {
        let f = write_temp("print(1)");
        let path = f.path().to_str().unwrap();
        let first = compute_leaf("mod_a", path, None, false);
        let rehashed = compute_leaf("mod_a", path, Some(&first), true);
        assert_eq!(first.leaf_hash, rehashed.leaf_hash);
    }

    #[test]
    fn merkle_root_is_deterministic() {
        let leaves = vec![
            Leaf {
                label: "a.py".into(),
                fs_path: "a.py".into(),
                mtime_ns: 1,
                size: 1,
                content_sha256: Some("x".into()),
                missing: false,
                leaf_hash: hex("file\0a.py\0x"),
            },
            Leaf {
                label: "b.py".into(),
                fs_path: "b.py".into(),
                mtime_ns: 1,
                size: 1,
                content_sha256: Some("y".into()),
                missing: false,
                leaf_hash: hex("file\0b.py\0y"),
            },
        ];
        let config_hash = config_leaf_hash("{}");
        let first = merkle_root(&leaves, &config_hash);
        let second = merkle_root(&leaves, &config_hash);
        assert_eq!(first, second);
    }

    #[test]
    fn merkle_root_changes_when_a_leaf_changes() {
        let config_hash = config_leaf_hash("{}");
        let leaves_a = vec![Leaf {
            label: "a.py".into(),
            fs_path: "a.py".into(),
            mtime_ns: 1,
            size: 1,
            content_sha256: Some("x".into()),
            missing: false,
            leaf_hash: hex("file\0a.py\0x"),
        }];
        let mut leaves_b = leaves_a.clone();
        leaves_b[0].leaf_hash = hex("file\0a.py\0z");

        assert_ne!(merkle_root(&leaves_a, &config_hash), merkle_root(&leaves_b, &config_hash));
    }
}
