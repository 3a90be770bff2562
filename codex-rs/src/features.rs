//! Per-cell features from a label mask: area, centroid and per-marker
//! intensity sums / means.

use ndarray::Array2;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog;
use crate::error::{CodexError, Result};
use crate::raster::{self, Raster};
use crate::region::MarkerImages;
use crate::segmentation::MASK_FILE;

pub const SUM_TABLE_FILE: &str = "data.csv";
pub const MEAN_TABLE_FILE: &str = "dataScaleSize.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct CellFeatures {
    pub label: u32,
    /// Pixel count.
    pub size: usize,
    pub y_cent: f64,
    pub x_cent: f64,
    /// One value per marker, in table marker order.
    pub values: Vec<f64>,
}

/// One row per labelled cell, ordered by label.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFeatureTable {
    pub markers: Vec<String>,
    pub rows: Vec<CellFeatures>,
}

impl CellFeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column of `marker`, one value per row.
    pub fn column(&self, marker: &str) -> Option<Vec<f64>> {
        let k = self.markers.iter().position(|m| m == marker)?;
        Some(self.rows.iter().map(|r| r.values[k]).collect())
    }

    /// Write with a leading unnamed row-index column:
    /// `,cellLabel,cellSize,Y_cent,X_cent,<markers...>`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        let mut header = vec!["", "cellLabel", "cellSize", "Y_cent", "X_cent"];
        header.extend(self.markers.iter().map(String::as_str));
        wtr.write_record(&header)?;
        for (i, row) in self.rows.iter().enumerate() {
            let mut record = vec![
                i.to_string(),
                row.label.to_string(),
                row.size.to_string(),
                row.y_cent.to_string(),
                row.x_cent.to_string(),
            ];
            record.extend(row.values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

struct CellAccumulator {
    size: usize,
    sum_y: f64,
    sum_x: f64,
    sums: Vec<f64>,
}

/// Measure every labelled cell of `mask` over every marker raster.
///
/// Returns `(sums, means)`; both share row order and geometry columns, and
/// each mean is the sum divided by the cell's pixel count.
pub fn extract(images: &MarkerImages, mask: &Array2<u32>) -> Result<(CellFeatureTable, CellFeatureTable)> {
    let markers = images.marker_names();
    let mut planes: Vec<Array2<f64>> = Vec::with_capacity(markers.len());
    for (name, raster) in images.iter() {
        if raster.shape() != mask.dim() {
            return Err(CodexError::ShapeMismatch {
                what: format!("marker '{}' against mask", name),
                expected: mask.dim(),
                actual: raster.shape(),
            });
        }
        planes.push(raster.to_f64());
    }

    let mut cells: BTreeMap<u32, CellAccumulator> = BTreeMap::new();
    for ((y, x), &label) in mask.indexed_iter() {
        if label == 0 {
            continue;
        }
        let acc = cells.entry(label).or_insert_with(|| CellAccumulator {
            size: 0,
            sum_y: 0.0,
            sum_x: 0.0,
            sums: vec![0.0; planes.len()],
        });
        acc.size += 1;
        acc.sum_y += y as f64;
        acc.sum_x += x as f64;
        for (sum, plane) in acc.sums.iter_mut().zip(&planes) {
            *sum += plane[[y, x]];
        }
    }

    let mut sum_rows = Vec::with_capacity(cells.len());
    let mut mean_rows = Vec::with_capacity(cells.len());
    for (label, acc) in cells {
        let n = acc.size as f64;
        let geometry = CellFeatures {
            label,
            size: acc.size,
            y_cent: acc.sum_y / n,
            x_cent: acc.sum_x / n,
            values: Vec::new(),
        };
        mean_rows.push(CellFeatures {
            values: acc.sums.iter().map(|s| s / n).collect(),
            ..geometry.clone()
        });
        sum_rows.push(CellFeatures {
            values: acc.sums,
            ..geometry
        });
    }

    Ok((
        CellFeatureTable {
            markers: markers.clone(),
            rows: sum_rows,
        },
        CellFeatureTable {
            markers,
            rows: mean_rows,
        },
    ))
}

/// Load every `.tif` / `.tiff` in `dir`, keyed by file stem.
pub fn load_marker_dir(dir: &Path) -> Result<MarkerImages> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_tiff = matches!(path.extension().and_then(|e| e.to_str()), Some("tif" | "tiff"));
        if is_tiff && fs::metadata(&path)?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut images = MarkerImages::new();
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        images.insert(stem, Raster::read_tiff(&path)?)?;
    }
    Ok(images)
}

fn subdir_names(dir: &Path) -> Result<Vec<String>> {
    Ok(catalog::subdirectories(dir)?
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(String::from))
        .collect())
}

/// Extract and write feature tables for one region directory pair.
pub fn extract_region(marker_region_dir: &Path, segmentation_region_dir: &Path) -> Result<usize> {
    let mask = raster::read_mask_tiff(&segmentation_region_dir.join(MASK_FILE))?;
    let images = load_marker_dir(marker_region_dir)?;
    let (sums, means) = extract(&images, &mask)?;
    sums.write_csv(&segmentation_region_dir.join(SUM_TABLE_FILE))?;
    means.write_csv(&segmentation_region_dir.join(MEAN_TABLE_FILE))?;
    Ok(sums.len())
}

/// Run `extract_region` for each region present under both directories,
/// one region at a time. Returns the processed region names.
pub fn extract_directory(
    marker_dir: &Path,
    segmentation_dir: &Path,
    progress: impl Fn(f64, &str),
) -> Result<Vec<String>> {
    let marker_regions = subdir_names(marker_dir)?;
    let regions: Vec<String> = subdir_names(segmentation_dir)?
        .into_iter()
        .filter(|r| marker_regions.contains(r))
        .collect();

    let total = regions.len();
    for (i, region) in regions.iter().enumerate() {
        let n_cells = extract_region(&marker_dir.join(region), &segmentation_dir.join(region))?;
        log::info!("{}: features extracted for {} cells", region, n_cells);
        progress(
            (i + 1) as f64 / total as f64,
            &format!("Extracted features {}/{} ({})", i + 1, total, region),
        );
    }
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn images() -> MarkerImages {
        let mut imgs = MarkerImages::new();
        imgs.insert("CD3", Raster::U16(array![[1, 2, 3], [4, 5, 6], [7, 8, 9]])).unwrap();
        imgs.insert("DAPI", Raster::F32(array![[0.5, 0.5, 0.0], [0.0, 1.5, 0.0], [0.0, 0.0, 2.0]]))
            .unwrap();
        imgs
    }

    #[test]
    fn single_cell_sum_and_mean_are_exact() {
        let mask = array![[0u32, 4, 4], [0, 4, 4], [0, 0, 0]];
        let (sums, means) = extract(&images(), &mask).unwrap();
        assert_eq!(sums.len(), 1);
        let row = &sums.rows[0];
        assert_eq!((row.label, row.size), (4, 4));
        assert_eq!((row.y_cent, row.x_cent), (0.5, 1.5));
        assert_eq!(sums.column("CD3").unwrap(), vec![2.0 + 3.0 + 5.0 + 6.0]);
        assert_eq!(means.column("CD3").unwrap(), vec![16.0 / 4.0]);
        assert_eq!(sums.column("DAPI").unwrap(), vec![2.0]);
        assert_eq!(means.column("DAPI").unwrap(), vec![0.5]);
    }

    #[test]
    fn rows_follow_label_order_without_relabelling() {
        let mask = array![[9u32, 0, 2], [9, 0, 2], [0, 5, 0]];
        let (sums, means) = extract(&images(), &mask).unwrap();
        let labels: Vec<u32> = sums.rows.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![2, 5, 9]);
        assert_eq!(sums.markers, vec!["CD3", "DAPI"]);
        for (s, m) in sums.rows.iter().zip(&means.rows) {
            assert_eq!((s.label, s.size, s.y_cent, s.x_cent), (m.label, m.size, m.y_cent, m.x_cent));
        }
    }

    #[test]
    fn empty_mask_gives_empty_tables() {
        let (sums, means) = extract(&images(), &Array2::zeros((3, 3))).unwrap();
        assert!(sums.is_empty() && means.is_empty());
    }

    #[test]
    fn mask_shape_must_match() {
        let err = extract(&images(), &Array2::zeros((2, 3))).unwrap_err();
        assert!(matches!(err, CodexError::ShapeMismatch { .. }));
    }

    #[test]
    fn csv_has_index_column_and_marker_headers() {
        let tmp = tempfile::tempdir().unwrap();
        let mask = array![[1u32, 0, 0], [0, 0, 0], [0, 0, 0]];
        let (sums, _) = extract(&images(), &mask).unwrap();
        let path = tmp.path().join("data.csv");
        sums.write_csv(&path).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ",cellLabel,cellSize,Y_cent,X_cent,CD3,DAPI");
        assert_eq!(lines[1], "0,1,1,0,0,1,0.5");
    }

    #[test]
    fn marker_dir_skips_other_files_and_reports_broken_ones() {
        let tmp = tempfile::tempdir().unwrap();
        raster::write_mask_tiff(&tmp.path().join("CD3.tif"), &array![[1u32, 2], [3, 4]]).unwrap();
        fs::write(tmp.path().join("notes.txt"), b"").unwrap();
        let images = load_marker_dir(tmp.path()).unwrap();
        assert_eq!(images.marker_names(), vec!["CD3"]);

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(tmp.path().join("gone.tif"), tmp.path().join("DAPI.tif")).unwrap();
            assert!(matches!(load_marker_dir(tmp.path()), Err(CodexError::Io(_))));
        }
    }
}
