//! Deterministic node ID generation.
//!
//! IDs must be stable across runs for a given label+name+start-line so that
//! graphs built from the same source tree on different machines (or at
//! different times) agree. A 32-bit FNV-1a hash of the input is used;
//! collisions are accepted per the design notes — `label` disambiguates in
//! display, and IDs are unique per (kind, label, file, line) tuple by
//! construction, not by the hash alone.

fn fnv1a_hex(s: &str) -> String {
    let mut hash: u32 = 0x811c9dc5;
    for b in s.as_bytes() {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    format!("{hash:x}")
}

pub fn make_module_id(rel_label: &str) -> String {
    format!("mod_{}", fnv1a_hex(rel_label))
}

pub fn make_class_id(file_label: &str, class_name: &str) -> String {
    format!("cls_{}_{}", fnv1a_hex(file_label), class_name)
}

pub fn make_func_id(file_label: &str, func_name: &str, id_line: u32) -> String {
    format!("fn_{}_{}_{}", fnv1a_hex(file_label), func_name, id_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_deterministic() {
        assert_eq!(make_module_id("pkg/a.py"), make_module_id("pkg/a.py"));
        assert_eq!(
            make_func_id("pkg/a.py", "foo", 3),
            make_func_id("pkg/a.py", "foo", 3)
        );
    }

    #[test]
    fn ids_vary_with_input() {
        assert_ne!(make_module_id("pkg/a.py"), make_module_id("pkg/b.py"));
        assert_ne!(
            make_func_id("pkg/a.py", "foo", 3),
            make_func_id("pkg/a.py", "foo", 4)
        );
        assert_ne!(
            make_class_id("pkg/a.py", "Foo"),
            make_func_id("pkg/a.py", "Foo", 0)
        );
    }
}
