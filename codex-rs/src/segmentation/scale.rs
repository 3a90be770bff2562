//! Min-max scaling of marker rasters into segmentation input channels.

use ndarray::Array2;

use crate::error::{CodexError, Result};
use crate::raster::Raster;
use crate::region::MarkerImages;

fn min_max(values: &Array2<f64>) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Rescale to `[0, 1]`. A raster with no spread is a `DegenerateRange` error.
fn rescale_unit(values: Array2<f64>, what: &str) -> Result<Array2<f64>> {
    let (lo, hi) = min_max(&values);
    let range = hi - lo;
    if !(range > 0.0) {
        return Err(CodexError::DegenerateRange { what: what.to_string() });
    }
    Ok(values.mapv(|v| (v - lo) / range))
}

/// Raster as f64, min-max normalised to `[0, 1]` when `enabled`.
pub fn scale(raster: &Raster, enabled: bool) -> Result<Array2<f64>> {
    scale_named(raster, enabled, "raster")
}

fn scale_named(raster: &Raster, enabled: bool, what: &str) -> Result<Array2<f64>> {
    let values = raster.to_f64();
    if enabled {
        rescale_unit(values, what)
    } else {
        Ok(values)
    }
}

/// Scale each marker independently, sum them, and stretch the sum to 8 bits.
pub fn sum_scaled<S: AsRef<str>>(markers: &[S], images: &MarkerImages, enabled: bool) -> Result<Array2<u8>> {
    let mut total: Option<Array2<f64>> = None;
    for marker in markers {
        let marker = marker.as_ref();
        let raster = images
            .get(marker)
            .ok_or_else(|| CodexError::MarkerNotLoaded(marker.to_string()))?;
        let scaled = scale_named(raster, enabled, &format!("marker '{}'", marker))?;
        total = Some(match total {
            None => scaled,
            Some(acc) => acc + &scaled,
        });
    }
    let total = total.ok_or(CodexError::NoMarkers("channel sum"))?;

    let names: Vec<&str> = markers.iter().map(|m| m.as_ref()).collect();
    let unit = rescale_unit(total, &format!("sum of [{}]", names.join(", ")))?;
    // `as u8` truncates, matching an 8-bit cast of the stretched sum
    Ok(unit.mapv(|v| (v * 255.0) as u8))
}
