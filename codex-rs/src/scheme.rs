//! File-naming conventions of the supported acquisition systems.
//!
//! Fusion exports keep one directory per region with files named
//! `<marker>.tif`. Keyence/CODEX processor exports encode everything in the
//! file name: `reg001_cyc002_ch003_<marker>.tif`.

use clap::ValueEnum;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::{CodexError, Result};
use crate::marker;

const FUSION_RE: &str = r"^(.+)\.tif$";
const KEYENCE_RE: &str = r"^(reg\d+)_(cyc\d+)_(ch\d+)_(.+)\.tif$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamingScheme {
    /// `<root>/<region>/<marker>.tif`
    Fusion,
    /// `<root>/<dir>/.../reg<N>_cyc<N>_ch<N>_<marker>.tif`
    Keyence,
}

impl NamingScheme {
    pub fn name(self) -> &'static str {
        match self {
            NamingScheme::Fusion => "fusion",
            NamingScheme::Keyence => "keyence",
        }
    }
}

/// One discovered marker image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    pub path: PathBuf,
    pub region: String,
    pub cycle: Option<String>,
    pub channel: Option<String>,
    pub marker: String,
}

/// A naming scheme with its pattern compiled once.
pub struct FilenameParser {
    scheme: NamingScheme,
    re: Regex,
}

impl FilenameParser {
    pub fn new(scheme: NamingScheme) -> Result<Self> {
        let re = match scheme {
            NamingScheme::Fusion => Regex::new(FUSION_RE)?,
            NamingScheme::Keyence => Regex::new(KEYENCE_RE)?,
        };
        Ok(Self { scheme, re })
    }

    pub fn scheme(&self) -> NamingScheme {
        self.scheme
    }

    pub fn parse(&self, path: &Path) -> Result<MarkerRecord> {
        let fail = || CodexError::Parse {
            path: path.to_path_buf(),
            scheme: self.scheme.name(),
        };
        let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(fail)?;
        let cap = self.re.captures(file_name).ok_or_else(fail)?;

        match self.scheme {
            NamingScheme::Fusion => {
                let region = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .ok_or_else(fail)?;
                Ok(MarkerRecord {
                    path: path.to_path_buf(),
                    region: region.to_string(),
                    cycle: None,
                    channel: None,
                    marker: marker::normalize(&cap[1]),
                })
            }
            NamingScheme::Keyence => Ok(MarkerRecord {
                path: path.to_path_buf(),
                region: cap[1].to_string(),
                cycle: Some(cap[2].to_string()),
                channel: Some(cap[3].to_string()),
                marker: marker::normalize(&cap[4]),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyence() -> FilenameParser {
        FilenameParser::new(NamingScheme::Keyence).unwrap()
    }

    #[test]
    fn keyence_extracts_all_four_fields() {
        let rec = keyence()
            .parse(Path::new("/data/run1/reg001_cyc002_ch003_CD45.tif"))
            .unwrap();
        assert_eq!(rec.region, "reg001");
        assert_eq!(rec.cycle.as_deref(), Some("cyc002"));
        assert_eq!(rec.channel.as_deref(), Some("ch003"));
        assert_eq!(rec.marker, "CD45");
    }

    #[test]
    fn keyence_normalizes_marker() {
        let rec = keyence()
            .parse(Path::new("reg002_cyc010_ch004_IL:2R.tif"))
            .unwrap();
        assert_eq!(rec.marker, "IL_2R");
    }

    #[test]
    fn keyence_rejects_missing_channel() {
        let err = keyence().parse(Path::new("reg001_cyc002_CD45.tif")).unwrap_err();
        assert!(matches!(err, CodexError::Parse { scheme: "keyence", .. }));
    }

    #[test]
    fn keyence_rejects_wrong_prefix_or_extension() {
        let p = keyence();
        assert!(p.parse(Path::new("region001_cyc002_ch003_CD45.tif")).is_err());
        assert!(p.parse(Path::new("reg001-cyc002-ch003-CD45.tif")).is_err());
        assert!(p.parse(Path::new("reg001_cyc002_ch003_CD45.png")).is_err());
        assert!(p.parse(Path::new("reg001_cyc002_ch003_.tif")).is_err());
    }

    #[test]
    fn fusion_takes_region_from_parent_dir() {
        let p = FilenameParser::new(NamingScheme::Fusion).unwrap();
        let rec = p.parse(Path::new("/markers/tonsil_1/Pan-Cytokeratin.tif")).unwrap();
        assert_eq!(rec.region, "tonsil_1");
        assert_eq!(rec.marker, "Pan-Cytokeratin");
        assert_eq!(rec.cycle, None);
        assert_eq!(rec.channel, None);
    }

    #[test]
    fn fusion_rejects_other_extensions() {
        let p = FilenameParser::new(NamingScheme::Fusion).unwrap();
        assert!(p.parse(Path::new("/markers/r1/CD3.tiff")).is_err());
        assert!(p.parse(Path::new("/markers/r1/.tif")).is_err());
        assert!(p.parse(Path::new("/markers/r1/notes.txt")).is_err());
    }
}
