//! Region → marker-file metadata, built by walking the acquisition tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CodexError, Result};
use crate::marker;
use crate::scheme::{FilenameParser, MarkerRecord, NamingScheme};

/// Per-region marker records, keyed by region name.
///
/// A catalog is never mutated after it is built; `subset` and
/// `deduplicated` return new catalogs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    regions: BTreeMap<String, Vec<MarkerRecord>>,
}

/// Sorted subdirectories of `dir`, following symlinks. Unreadable entries
/// are errors, not skipped.
pub(crate) fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if fs::metadata(&path)?.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Walk one region directory recursively and parse every file in it.
///
/// Any file that does not follow `scheme` aborts the build.
pub fn build_region(region_dir: &Path, scheme: NamingScheme) -> Result<(String, Vec<MarkerRecord>)> {
    let parser = FilenameParser::new(scheme)?;
    build_region_with(region_dir, &parser)
}

fn build_region_with(region_dir: &Path, parser: &FilenameParser) -> Result<(String, Vec<MarkerRecord>)> {
    let mut records = Vec::new();
    for entry in WalkDir::new(region_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        records.push(parser.parse(entry.path())?);
    }

    let mut regions: Vec<String> = records.iter().map(|r| r.region.clone()).collect();
    regions.sort();
    regions.dedup();
    match regions.len() {
        0 => Err(CodexError::EmptyRegion(region_dir.to_path_buf())),
        1 => {
            let region = regions.remove(0);
            log::debug!(
                "{}: {} marker files under {}",
                region,
                records.len(),
                region_dir.display()
            );
            Ok((region, records))
        }
        _ => Err(CodexError::MixedRegion {
            dir: region_dir.to_path_buf(),
            regions,
        }),
    }
}

impl Catalog {
    /// Treat every immediate subdirectory of `root` as one region.
    pub fn build(root: &Path, scheme: NamingScheme) -> Result<Self> {
        let parser = FilenameParser::new(scheme)?;

        let region_dirs = subdirectories(root)?;

        let mut regions = BTreeMap::new();
        for dir in &region_dirs {
            let (region, records) = build_region_with(dir, &parser)?;
            if regions.insert(region.clone(), records).is_some() {
                return Err(CodexError::DuplicateRegion(region));
            }
        }
        log::info!(
            "Catalogued {} regions under {} ({} scheme)",
            regions.len(),
            root.display(),
            scheme.name()
        );
        Ok(Self { regions })
    }

    /// Assemble a catalog from already-parsed records, grouping by region.
    pub fn from_records(records: impl IntoIterator<Item = MarkerRecord>) -> Self {
        let mut regions: BTreeMap<String, Vec<MarkerRecord>> = BTreeMap::new();
        for rec in records {
            regions.entry(rec.region.clone()).or_default().push(rec);
        }
        Self { regions }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region names in sorted order.
    pub fn region_names(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    pub fn region(&self, name: &str) -> Option<&[MarkerRecord]> {
        self.regions.get(name).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MarkerRecord])> {
        self.regions.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn records(&self) -> impl Iterator<Item = &MarkerRecord> {
        self.regions.values().flatten()
    }

    /// Keep only the named regions. Fails on the first unknown name.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut regions = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let records = self
                .regions
                .get(name)
                .ok_or_else(|| CodexError::UnknownRegion(name.to_string()))?;
            regions.insert(name.to_string(), records.clone());
        }
        Ok(Self { regions })
    }

    /// Rename repeated marker names within each region (`CD3`, `CD3_2`, ...).
    pub fn deduplicated(&self) -> Self {
        let regions = self
            .regions
            .iter()
            .map(|(region, records)| {
                let names: Vec<&str> = records.iter().map(|r| r.marker.as_str()).collect();
                let renamed = marker::deduplicate(&names);
                let records = records
                    .iter()
                    .zip(renamed)
                    .map(|(r, marker)| MarkerRecord { marker, ..r.clone() })
                    .collect();
                (region.clone(), records)
            })
            .collect();
        Self { regions }
    }

    /// Resolve the single file holding `marker` in `region`.
    pub fn marker_path(&self, region: &str, marker: &str) -> Result<&Path> {
        let records = self
            .region(region)
            .ok_or_else(|| CodexError::UnknownRegion(region.to_string()))?;
        resolve_marker(region, records, marker).map(|r| r.path.as_path())
    }

    /// Dump every record as `path,region,cycle,channel,marker`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["path", "region", "cycle", "channel", "marker"])?;
        for rec in self.records() {
            wtr.write_record([
                &*rec.path.to_string_lossy(),
                rec.region.as_str(),
                rec.cycle.as_deref().unwrap_or(""),
                rec.channel.as_deref().unwrap_or(""),
                rec.marker.as_str(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

pub(crate) fn resolve_marker<'a>(
    region: &str,
    records: &'a [MarkerRecord],
    marker: &str,
) -> Result<&'a MarkerRecord> {
    let mut matches = records.iter().filter(|r| r.marker == marker);
    match (matches.next(), matches.count()) {
        (None, _) => Err(CodexError::MissingMarker {
            region: region.to_string(),
            marker: marker.to_string(),
        }),
        (Some(rec), 0) => Ok(rec),
        (Some(_), rest) => Err(CodexError::AmbiguousMarker {
            region: region.to_string(),
            marker: marker.to_string(),
            count: rest + 1,
        }),
    }
}
