//! In-memory region → marker → raster container.

use std::collections::BTreeMap;

use crate::catalog::{resolve_marker, Catalog};
use crate::error::{CodexError, Result};
use crate::raster::{CropWindow, Raster};
use crate::scheme::MarkerRecord;

/// Rasters of one region, keyed by marker name. All rasters share a shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerImages {
    markers: BTreeMap<String, Raster>,
}

impl MarkerImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raster, rejecting one whose shape differs from those already held.
    pub fn insert(&mut self, marker: impl Into<String>, raster: Raster) -> Result<()> {
        let marker = marker.into();
        if let Some(expected) = self.shape() {
            let actual = raster.shape();
            if actual != expected {
                return Err(CodexError::ShapeMismatch {
                    what: format!("marker '{}'", marker),
                    expected,
                    actual,
                });
            }
        }
        self.markers.insert(marker, raster);
        Ok(())
    }

    pub fn get(&self, marker: &str) -> Option<&Raster> {
        self.markers.get(marker)
    }

    /// Shape shared by every raster, `None` when empty.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.markers.values().next().map(Raster::shape)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Marker names in sorted order.
    pub fn marker_names(&self) -> Vec<String> {
        self.markers.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster)> {
        self.markers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Load the requested markers of one region through its records.
    pub fn load<S: AsRef<str>>(region: &str, records: &[MarkerRecord], markers: &[S]) -> Result<Self> {
        let mut images = Self::new();
        for marker in markers {
            let rec = resolve_marker(region, records, marker.as_ref())?;
            images.insert(marker.as_ref(), Raster::read_tiff(&rec.path)?)?;
        }
        Ok(images)
    }

    pub fn crop(&self, center_x: i64, center_y: i64, length: u32) -> Result<Self> {
        let Some(shape) = self.shape() else {
            return Ok(Self::new());
        };
        let window = CropWindow::centered(center_x, center_y, length, shape)?;
        let markers = self
            .markers
            .iter()
            .map(|(name, raster)| (name.clone(), raster.crop(&window)))
            .collect();
        Ok(Self { markers })
    }
}

/// Rasters for several regions, keyed by region name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionMarkerObject {
    regions: BTreeMap<String, MarkerImages>,
}

impl RegionMarkerObject {
    /// Read `markers` for every region of the catalog.
    pub fn load<S: AsRef<str>>(catalog: &Catalog, markers: &[S]) -> Result<Self> {
        let mut regions = BTreeMap::new();
        let total = catalog.len();
        for (i, (region, records)) in catalog.iter().enumerate() {
            let images = MarkerImages::load(region, records, markers)?;
            log::info!("{}: loaded {} markers ({}/{})", region, images.len(), i + 1, total);
            regions.insert(region.to_string(), images);
        }
        Ok(Self { regions })
    }

    pub fn insert(&mut self, region: impl Into<String>, images: MarkerImages) {
        self.regions.insert(region.into(), images);
    }

    pub fn region(&self, name: &str) -> Result<&MarkerImages> {
        self.regions
            .get(name)
            .ok_or_else(|| CodexError::UnknownRegion(name.to_string()))
    }

    pub fn region_names(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MarkerImages)> {
        self.regions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut regions = BTreeMap::new();
        for name in names {
            let images = self.region(name.as_ref())?;
            regions.insert(name.as_ref().to_string(), images.clone());
        }
        Ok(Self { regions })
    }

    /// Crop every raster of every region to the same centred square.
    pub fn crop(&self, center_x: i64, center_y: i64, length: u32) -> Result<Self> {
        let regions = self
            .regions
            .iter()
            .map(|(name, images)| Ok((name.clone(), images.crop(center_x, center_y, length)?)))
            .collect::<Result<_>>()?;
        Ok(Self { regions })
    }
}
