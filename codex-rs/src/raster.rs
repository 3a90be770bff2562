//! Single-channel rasters with their source pixel type, plus TIFF I/O for
//! rasters, label masks and RGB previews.

use ndarray::{s, Array2, Array3};
use std::fs;
use std::io::BufWriter;
use std::ops::Range;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray16, Gray32, Gray32Float, Gray64Float, Gray8, RGB8};
use tiff::encoder::TiffEncoder;
use tiff::ColorType;

use crate::error::{CodexError, Result};

/// A 2D image, row-major `(height, width)`, keeping the decoded pixel type.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    U8(Array2<u8>),
    U16(Array2<u16>),
    U32(Array2<u32>),
    F32(Array2<f32>),
    F64(Array2<f64>),
}

impl Raster {
    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Raster::U8(a) => a.dim(),
            Raster::U16(a) => a.dim(),
            Raster::U32(a) => a.dim(),
            Raster::F32(a) => a.dim(),
            Raster::F64(a) => a.dim(),
        }
    }

    pub fn to_f64(&self) -> Array2<f64> {
        match self {
            Raster::U8(a) => a.mapv(f64::from),
            Raster::U16(a) => a.mapv(f64::from),
            Raster::U32(a) => a.mapv(f64::from),
            Raster::F32(a) => a.mapv(f64::from),
            Raster::F64(a) => a.clone(),
        }
    }

    /// Pixel value at `(row, col)` widened to f64.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        match self {
            Raster::U8(a) => a.get((row, col)).map(|&v| f64::from(v)),
            Raster::U16(a) => a.get((row, col)).map(|&v| f64::from(v)),
            Raster::U32(a) => a.get((row, col)).map(|&v| f64::from(v)),
            Raster::F32(a) => a.get((row, col)).map(|&v| f64::from(v)),
            Raster::F64(a) => a.get((row, col)).copied(),
        }
    }

    /// Copy out the pixels inside `window`.
    pub fn crop(&self, window: &CropWindow) -> Raster {
        let (r, c) = (window.rows.clone(), window.cols.clone());
        match self {
            Raster::U8(a) => Raster::U8(a.slice(s![r, c]).to_owned()),
            Raster::U16(a) => Raster::U16(a.slice(s![r, c]).to_owned()),
            Raster::U32(a) => Raster::U32(a.slice(s![r, c]).to_owned()),
            Raster::F32(a) => Raster::F32(a.slice(s![r, c]).to_owned()),
            Raster::F64(a) => Raster::F64(a.slice(s![r, c]).to_owned()),
        }
    }

    /// Decode the first page of a single-channel TIFF.
    pub fn read_tiff(path: &Path) -> Result<Raster> {
        let file = fs::File::open(path)?;
        let mut decoder = Decoder::new(file)?;
        let (width, height) = decoder.dimensions()?;
        let color = decoder.colortype()?;
        if !matches!(color, ColorType::Gray(_)) {
            return Err(CodexError::UnsupportedPixelFormat {
                path: path.to_path_buf(),
                format: format!("{:?}", color),
            });
        }
        let shape = (height as usize, width as usize);
        let raster = match decoder.read_image()? {
            DecodingResult::U8(v) => Raster::U8(Array2::from_shape_vec(shape, v)?),
            DecodingResult::U16(v) => Raster::U16(Array2::from_shape_vec(shape, v)?),
            DecodingResult::U32(v) => Raster::U32(Array2::from_shape_vec(shape, v)?),
            DecodingResult::F32(v) => Raster::F32(Array2::from_shape_vec(shape, v)?),
            DecodingResult::F64(v) => Raster::F64(Array2::from_shape_vec(shape, v)?),
            _ => {
                return Err(CodexError::UnsupportedPixelFormat {
                    path: path.to_path_buf(),
                    format: format!("{:?}", color),
                })
            }
        };
        Ok(raster)
    }

    pub fn write_tiff(&self, path: &Path) -> Result<()> {
        let (h, w) = self.shape();
        let file = fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        let mut encoder = TiffEncoder::new(&mut writer)?;
        match self {
            Raster::U8(a) => encoder.write_image::<Gray8>(w as u32, h as u32, &row_major(a))?,
            Raster::U16(a) => encoder.write_image::<Gray16>(w as u32, h as u32, &row_major(a))?,
            Raster::U32(a) => encoder.write_image::<Gray32>(w as u32, h as u32, &row_major(a))?,
            Raster::F32(a) => encoder.write_image::<Gray32Float>(w as u32, h as u32, &row_major(a))?,
            Raster::F64(a) => encoder.write_image::<Gray64Float>(w as u32, h as u32, &row_major(a))?,
        }
        Ok(())
    }
}

fn row_major<T: Copy>(a: &Array2<T>) -> Vec<T> {
    a.iter().copied().collect()
}

/// Square window `[cy - L/2, cy + L/2) × [cx - L/2, cx + L/2)`, with the
/// half-length bounds truncated toward zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropWindow {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl CropWindow {
    /// Fails when any part of the window falls outside `shape`.
    pub fn centered(center_x: i64, center_y: i64, length: u32, shape: (usize, usize)) -> Result<Self> {
        let len = i64::from(length);
        // (2c - L) / 2 truncates like int(c - L / 2) for non-negative bounds
        let doubled = |c: i64| {
            let twice = c.checked_mul(2)?;
            Some((twice.checked_sub(len)?, twice.checked_add(len)?))
        };
        let (h, w) = (shape.0 as i64, shape.1 as i64);
        match (doubled(center_y), doubled(center_x)) {
            (Some((r0, r1)), Some((c0, c1))) if r0 >= 0 && c0 >= 0 && r1 / 2 <= h && c1 / 2 <= w => Ok(Self {
                rows: (r0 / 2) as usize..(r1 / 2) as usize,
                cols: (c0 / 2) as usize..(c1 / 2) as usize,
            }),
            _ => {
                let reported = |c: i64| {
                    let twice = c.saturating_mul(2);
                    (twice.saturating_sub(len) / 2, twice.saturating_add(len) / 2)
                };
                Err(CodexError::CropOutOfBounds {
                    rows: reported(center_y),
                    cols: reported(center_x),
                    shape,
                })
            }
        }
    }

    /// `(height, width)` of the window.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }
}

/// Write a label mask as a 32-bit unsigned grayscale TIFF.
pub fn write_mask_tiff(path: &Path, mask: &Array2<u32>) -> Result<()> {
    Raster::U32(mask.clone()).write_tiff(path)
}

/// Read a label mask, widening any unsigned integer pixel type to u32.
pub fn read_mask_tiff(path: &Path) -> Result<Array2<u32>> {
    match Raster::read_tiff(path)? {
        Raster::U8(a) => Ok(a.mapv(u32::from)),
        Raster::U16(a) => Ok(a.mapv(u32::from)),
        Raster::U32(a) => Ok(a),
        other => Err(CodexError::UnsupportedPixelFormat {
            path: path.to_path_buf(),
            format: format!("floating-point mask of shape {:?}", other.shape()),
        }),
    }
}

/// Write an `(height, width, 3)` image as an 8-bit RGB TIFF.
pub fn write_rgb_tiff(path: &Path, rgb: &Array3<u8>) -> Result<()> {
    let (h, w, _) = rgb.dim();
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = TiffEncoder::new(&mut writer)?;
    let data: Vec<u8> = rgb.iter().copied().collect();
    encoder.write_image::<RGB8>(w as u32, h as u32, &data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn crop_window_matches_truncated_bounds() {
        let w = CropWindow::centered(10, 20, 4, (100, 100)).unwrap();
        assert_eq!(w.rows, 18..22);
        assert_eq!(w.cols, 8..12);

        let w = CropWindow::centered(10, 10, 5, (100, 100)).unwrap();
        assert_eq!(w.rows, 7..12);
        assert_eq!(w.shape(), (5, 5));
    }

    #[test]
    fn crop_window_out_of_bounds_fails() {
        assert!(matches!(
            CropWindow::centered(1, 10, 4, (20, 20)),
            Err(CodexError::CropOutOfBounds { .. })
        ));
        assert!(CropWindow::centered(18, 10, 6, (20, 20)).is_err());
        assert!(CropWindow::centered(17, 10, 6, (20, 20)).is_ok());
    }

    #[test]
    fn huge_crop_centre_is_out_of_bounds() {
        let far = i64::MAX / 2 + 10;
        assert!(matches!(
            CropWindow::centered(far, 5, 4, (10, 10)),
            Err(CodexError::CropOutOfBounds { .. })
        ));
        assert!(matches!(
            CropWindow::centered(5, i64::MIN, 4, (10, 10)),
            Err(CodexError::CropOutOfBounds { .. })
        ));
    }

    #[test]
    fn crop_keeps_pixel_type() {
        let r = Raster::U16(Array2::from_shape_fn((6, 6), |(y, x)| (y * 10 + x) as u16));
        let w = CropWindow::centered(3, 3, 2, (6, 6)).unwrap();
        assert_eq!(r.crop(&w), Raster::U16(array![[22, 23], [32, 33]]));
    }

    #[test]
    fn tiff_roundtrip_u16_and_mask() {
        let tmp = tempfile::tempdir().unwrap();
        let raster = Raster::U16(Array2::from_shape_fn((3, 5), |(y, x)| (y * 100 + x) as u16));
        let path = tmp.path().join("m.tif");
        raster.write_tiff(&path).unwrap();
        assert_eq!(Raster::read_tiff(&path).unwrap(), raster);

        let mask = array![[0u32, 1, 1], [70000, 0, 2]];
        let mask_path = tmp.path().join("mask.tiff");
        write_mask_tiff(&mask_path, &mask).unwrap();
        assert_eq!(read_mask_tiff(&mask_path).unwrap(), mask);
    }

    #[test]
    fn rgb_tiff_is_rejected_as_raster() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rgb.tiff");
        write_rgb_tiff(&path, &Array3::zeros((2, 2, 3))).unwrap();
        assert!(matches!(
            Raster::read_tiff(&path),
            Err(CodexError::UnsupportedPixelFormat { .. })
        ));
    }
}
