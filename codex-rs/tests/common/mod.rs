#![allow(dead_code)]

use ndarray::Array2;
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype::Gray16, TiffEncoder};

/// Background 10, a bright square of half-width `r` at (`cy`, `cx`) with
/// values rising from 1000 so sums are distinguishable.
pub fn blob_raster(h: usize, w: usize, cy: usize, cx: usize, r: usize) -> Array2<u16> {
    Array2::from_shape_fn((h, w), |(y, x)| {
        if y.abs_diff(cy) <= r && x.abs_diff(cx) <= r {
            1000 + (y * w + x) as u16
        } else {
            10
        }
    })
}

pub fn constant_raster(h: usize, w: usize, value: u16) -> Array2<u16> {
    Array2::from_elem((h, w), value)
}

pub fn write_u16_tiff(path: &Path, data: &Array2<u16>) {
    let (h, w) = data.dim();
    let file = fs::File::create(path).unwrap();
    let mut writer = BufWriter::new(file);
    let mut encoder = TiffEncoder::new(&mut writer).unwrap();
    let flat: Vec<u16> = data.iter().copied().collect();
    encoder.write_image::<Gray16>(w as u32, h as u32, &flat).unwrap();
}
