//! Cross-region marker classification: which markers are safe to use in
//! every region, and why the others are not.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::catalog::Catalog;
use crate::error::Result;

const BLANK_RE: &str = r"(?i)^blank";

/// Classification of every marker name seen in a catalog.
///
/// `unique` is disjoint from the other three sets; `duplicated` and
/// `missing` may overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSummary {
    pub all: BTreeSet<String>,
    pub unique: BTreeSet<String>,
    pub blank: BTreeSet<String>,
    pub duplicated: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

impl MarkerSummary {
    /// Usable markers in lexicographic order.
    pub fn unique_sorted(&self) -> Vec<String> {
        self.unique.iter().cloned().collect()
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for MarkerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary of markers:")?;
        writeln!(f, "- Distinct markers: {}", self.all.len())?;
        writeln!(f, "- Unique markers: {} [{}]", self.unique.len(), join(&self.unique))?;
        writeln!(f, "- Blank markers: {} [{}]", self.blank.len(), join(&self.blank))?;
        writeln!(
            f,
            "- Markers duplicated in some regions: {} [{}]",
            self.duplicated.len(),
            join(&self.duplicated)
        )?;
        write!(
            f,
            "- Markers missing in some regions: {} [{}]",
            self.missing.len(),
            join(&self.missing)
        )
    }
}

/// Classify markers by per-region occurrence counts.
pub fn summarize_markers(catalog: &Catalog) -> Result<MarkerSummary> {
    let blank_re = Regex::new(BLANK_RE)?;

    // marker -> region -> count; absent regions count as zero
    let mut counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for (region, records) in catalog.iter() {
        for rec in records {
            *counts
                .entry(rec.marker.as_str())
                .or_default()
                .entry(region)
                .or_insert(0) += 1;
        }
    }

    let n_regions = catalog.len();
    let mut summary = MarkerSummary::default();
    for (marker, per_region) in &counts {
        summary.all.insert(marker.to_string());
        if blank_re.is_match(marker) {
            summary.blank.insert(marker.to_string());
            continue;
        }
        let is_missing = per_region.len() < n_regions;
        let is_duplicated = per_region.values().any(|&n| n > 1);
        if is_missing {
            summary.missing.insert(marker.to_string());
        }
        if is_duplicated {
            summary.duplicated.insert(marker.to_string());
        }
        if !is_missing && !is_duplicated {
            summary.unique.insert(marker.to_string());
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::MarkerRecord;
    use std::path::PathBuf;

    fn catalog(regions: &[(&str, &[&str])]) -> Catalog {
        Catalog::from_records(regions.iter().flat_map(|(region, markers)| {
            markers.iter().map(move |m| MarkerRecord {
                path: PathBuf::from(format!("{}/{}.tif", region, m)),
                region: region.to_string(),
                cycle: None,
                channel: None,
                marker: m.to_string(),
            })
        }))
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classifies_blank_duplicated_missing_unique() {
        let cat = catalog(&[("R1", &["A", "A", "B", "blank1"]), ("R2", &["A", "B", "C"])]);
        let s = summarize_markers(&cat).unwrap();
        assert_eq!(s.all, set(&["A", "B", "C", "blank1"]));
        assert_eq!(s.unique, set(&["B"]));
        assert_eq!(s.blank, set(&["blank1"]));
        assert_eq!(s.duplicated, set(&["A"]));
        assert_eq!(s.missing, set(&["C"]));
    }

    #[test]
    fn blank_match_is_case_insensitive_prefix() {
        let cat = catalog(&[("R1", &["BLANK", "Blank_2", "CD3", "notblank"])]);
        let s = summarize_markers(&cat).unwrap();
        assert_eq!(s.blank, set(&["BLANK", "Blank_2"]));
        assert_eq!(s.unique, set(&["CD3", "notblank"]));
    }

    #[test]
    fn marker_can_be_duplicated_and_missing() {
        let cat = catalog(&[("R1", &["X", "X"]), ("R2", &["Y"])]);
        let s = summarize_markers(&cat).unwrap();
        assert!(s.duplicated.contains("X") && s.missing.contains("X"));
        assert!(s.missing.contains("Y"));
        assert!(s.unique.is_empty());
    }

    #[test]
    fn unique_sorted_is_lexicographic() {
        let cat = catalog(&[("R1", &["Ki67", "CD8", "DAPI"]), ("R2", &["DAPI", "Ki67", "CD8"])]);
        let s = summarize_markers(&cat).unwrap();
        assert_eq!(s.unique_sorted(), vec!["CD8", "DAPI", "Ki67"]);
        let text = s.to_string();
        assert!(text.contains("Unique markers: 3 [CD8, DAPI, Ki67]"));
    }
}
