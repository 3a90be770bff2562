//! Marker-name cleanup: character sanitising and per-region de-duplication.

use std::collections::HashMap;

/// Replace every `/` and `:` in a marker name with `_`.
pub fn normalize(name: &str) -> String {
    name.replace(['/', ':'], "_")
}

/// Rename repeated names in encounter order: the first occurrence is kept,
/// the k-th becomes `{name}_{k}`.
pub fn deduplicate<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let count = seen.entry(name).or_insert(0);
            *count += 1;
            if *count == 1 {
                name.to_string()
            } else {
                format!("{}_{}", name, count)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_replaces_slash_and_colon() {
        assert_eq!(normalize("HLA-DR/DP:DQ"), "HLA-DR_DP_DQ");
        assert_eq!(normalize("CD45"), "CD45");
        assert_eq!(normalize("a//b::c"), "a__b__c");
    }

    #[test]
    fn normalize_is_idempotent() {
        for name in ["a/b", "x:y/z", "Ki67", "::", ""] {
            let once = normalize(name);
            assert_eq!(normalize(&once), once);
            assert!(!once.contains('/') && !once.contains(':'));
        }
    }

    #[test]
    fn deduplicate_suffixes_in_encounter_order() {
        let out = deduplicate(&["CD3", "CD3", "CD4", "CD3"]);
        assert_eq!(out, vec!["CD3", "CD3_2", "CD4", "CD3_3"]);
    }

    #[test]
    fn deduplicate_keeps_unique_lists_untouched() {
        let names = vec!["DAPI".to_string(), "CD8".to_string()];
        assert_eq!(deduplicate(&names), names);
        assert!(deduplicate::<&str>(&[]).is_empty());
    }
}
