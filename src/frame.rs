//! Captured frames and luminance conversion
//!
//! A [`Frame`] is the single 8-bit luminance plane the decoder works on.
//! Conversion uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8
//! (an approximation of 0.299*R + 0.587*G + 0.114*B). Large frames are
//! converted row-parallel with rayon.

use crate::error::FrameError;
use image::GenericImageView;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Coefficients for luminance conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Frames with at least this many pixels (640x480) are converted in parallel
const PARALLEL_PIXELS: usize = 640 * 480;

/// Extensions picked up when scanning a capture directory
const CAPTURE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// One captured image, reduced to luminance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    luma: Vec<u8>,
}

impl Frame {
    /// Wrap an existing luminance plane (1 byte per pixel, row-major)
    pub fn from_luma(width: usize, height: usize, luma: Vec<u8>) -> Result<Self, FrameError> {
        check_len(luma.len(), width, height, 1)?;
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// Convert raw RGB bytes (3 bytes per pixel)
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Result<Self, FrameError> {
        check_len(rgb.len(), width, height, 3)?;
        Ok(Self {
            width,
            height,
            luma: to_luma(rgb, width, height, 3),
        })
    }

    /// Convert raw RGBA bytes (alpha is ignored)
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize) -> Result<Self, FrameError> {
        check_len(rgba.len(), width, height, 4)?;
        Ok(Self {
            width,
            height,
            luma: to_luma(rgba, width, height, 4),
        })
    }

    /// Load an image file, downscaling so the longest side is at most
    /// `max_dim` when set. `Some(0)` keeps full size.
    pub fn open<P: AsRef<Path>>(path: P, max_dim: Option<u32>) -> Result<Self, FrameError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| FrameError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let rgb = match max_dim.filter(|&dim| dim > 0) {
            Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => img
                .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
                .to_rgb8(),
            _ => img.to_rgb8(),
        };

        let (width, height) = rgb.dimensions();
        Self::from_rgb(rgb.as_raw(), width as usize, height as usize)
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Luminance at (x, y). Panics when out of bounds.
    pub fn luma_at(&self, x: usize, y: usize) -> u8 {
        self.luma[y * self.width + x]
    }

    /// The whole luminance plane
    pub fn luma(&self) -> &[u8] {
        &self.luma
    }
}

fn check_len(actual: usize, width: usize, height: usize, channels: usize) -> Result<(), FrameError> {
    let expected = width * height * channels;
    if actual != expected {
        return Err(FrameError::BufferSize { expected, actual });
    }
    Ok(())
}

#[inline]
fn luminance(px: &[u8]) -> u8 {
    let lum = (COEF_R * px[0] as u32 + COEF_G * px[1] as u32 + COEF_B * px[2] as u32) >> 8;
    lum.min(255) as u8
}

fn convert_row(src: &[u8], dst: &mut [u8], channels: usize) {
    for (out, px) in dst.iter_mut().zip(src.chunks_exact(channels)) {
        *out = luminance(px);
    }
}

fn to_luma(pixels: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut luma = vec![0u8; width * height];
    if width == 0 || height == 0 {
        return luma;
    }

    let stride = width * channels;
    if width * height >= PARALLEL_PIXELS {
        luma.par_chunks_mut(width)
            .zip(pixels.par_chunks(stride))
            .for_each(|(row, src)| convert_row(src, row, channels));
    } else {
        for (row, src) in luma.chunks_mut(width).zip(pixels.chunks(stride)) {
            convert_row(src, row, channels);
        }
    }

    luma
}

/// List capture images under `root`, recursively and in sorted order,
/// keeping at most `limit` paths when set.
pub fn captures_in<P: AsRef<Path>>(root: P, limit: Option<usize>) -> Vec<PathBuf> {
    let mut stack = vec![root.as_ref().to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let is_image = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| CAPTURE_EXTENSIONS.contains(&ext.as_str()));
            if is_image {
                images.push(path);
            }
        }
    }

    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images
}
