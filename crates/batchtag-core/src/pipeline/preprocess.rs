//! Image preprocessing for WD-style taggers.
//!
//! The taggers expect:
//! - Input size: `edge × edge`, edge read from the model (448 for the v3 family)
//! - Aspect preserved: fit the longer side, letterbox the rest in white
//! - Channel order: BGR
//! - Values: raw 0–255 as `f32`, no normalization
//! - Tensor layout: NHWC [batch, height, width, channels]

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

use crate::error::{PipelineError, PipelineResult};

/// Number of color channels (BGR).
const CHANNELS: usize = 3;

/// Letterbox fill color.
const PAD_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Turn an RGB image into a `(1, edge, edge, 3)` BGR tensor.
pub fn prepare(pixels: &RgbImage, edge: u32) -> PipelineResult<Array4<f32>> {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::EmptyImage { width, height });
    }

    let canvas = letterbox(pixels, edge)?;
    to_bgr_tensor(&canvas)
}

/// Size of `width × height` scaled uniformly so the longer side is `edge`.
///
/// Sides are floored; the longer side always comes out exactly `edge`.
pub fn fit_dimensions(width: u32, height: u32, edge: u32) -> PipelineResult<(u32, u32)> {
    let longest = u64::from(width.max(height));
    if longest == 0 {
        return Err(PipelineError::EmptyImage { width, height });
    }

    let scale = |side: u32| (u64::from(side) * u64::from(edge) / longest) as u32;
    let (new_width, new_height) = (scale(width), scale(height));
    if new_width == 0 || new_height == 0 {
        return Err(PipelineError::InvalidDimensions {
            width: new_width,
            height: new_height,
        });
    }

    Ok((new_width, new_height))
}

/// Top-left offset that centers a `width × height` image on an `edge` square.
pub fn center_offset(width: u32, height: u32, edge: u32) -> (u32, u32) {
    ((edge - width) / 2, (edge - height) / 2)
}

/// Resize to fit `edge` with Lanczos3 and paste centered on a white square.
pub fn letterbox(pixels: &RgbImage, edge: u32) -> PipelineResult<RgbImage> {
    let (width, height) = pixels.dimensions();
    let (new_width, new_height) = fit_dimensions(width, height, edge)?;

    let mut canvas = RgbImage::from_pixel(edge, edge, PAD_COLOR);
    let (x, y) = center_offset(new_width, new_height, edge);

    if (new_width, new_height) == (width, height) {
        imageops::replace(&mut canvas, pixels, i64::from(x), i64::from(y));
    } else {
        let resized = imageops::resize(pixels, new_width, new_height, FilterType::Lanczos3);
        imageops::replace(&mut canvas, &resized, i64::from(x), i64::from(y));
    }

    Ok(canvas)
}

/// Swap RGB to BGR, cast to `f32` and add the batch dimension.
pub fn to_bgr_tensor(canvas: &RgbImage) -> PipelineResult<Array4<f32>> {
    let (width, height) = canvas.dimensions();

    let mut data = Vec::with_capacity(canvas.as_raw().len());
    for pixel in canvas.as_raw().chunks_exact(CHANNELS) {
        data.extend([pixel[2] as f32, pixel[1] as f32, pixel[0] as f32]);
    }

    Array4::from_shape_vec((1, height as usize, width as usize, CHANNELS), data)
        .map_err(|_| PipelineError::InvalidDimensions { width, height })
}
