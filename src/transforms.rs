//! Image preprocessing in front of the detector.

use image::imageops;
use ndarray::Array3;

use crate::config::{InputConfig, InputFormat};

/// Detectron2's test-time resize: the short edge goes to `min_size` unless
/// that pushes the long edge past `max_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeShortestEdge {
    pub min_size: u32,
    pub max_size: u32,
}

impl ResizeShortestEdge {
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (w, h) = (width as f64, height as f64);
        let mut scale = self.min_size as f64 / w.min(h);
        if w.max(h) * scale > self.max_size as f64 {
            scale = self.max_size as f64 / w.max(h);
        }
        let new_w = ((w * scale + 0.5) as u32).clamp(1, self.max_size);
        let new_h = ((h * scale + 0.5) as u32).clamp(1, self.max_size);
        (new_w, new_h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    ShortestEdge(ResizeShortestEdge),
    Exact { width: u32, height: u32 },
}

impl Resize {
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Resize::ShortestEdge(r) => r.target_size(width, height),
            Resize::Exact { width, height } => (*width, *height),
        }
    }
}

impl From<&InputConfig> for Resize {
    fn from(input: &InputConfig) -> Self {
        match input.fixed_size {
            Some((width, height)) => Resize::Exact { width, height },
            None => Resize::ShortestEdge(ResizeShortestEdge {
                min_size: input.min_size_test,
                max_size: input.max_size_test,
            }),
        }
    }
}

/// A page image turned into model input, with the sizes needed to map boxes back.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub tensor: Array3<f32>,
    pub original: (u32, u32),
    pub resized: (u32, u32),
}

impl PreparedImage {
    /// Factors taking resized coordinates back to the original image.
    pub fn scale(&self) -> (f32, f32) {
        (
            self.original.0 as f32 / self.resized.0 as f32,
            self.original.1 as f32 / self.resized.1 as f32,
        )
    }
}

pub fn prepare(img: &image::DynamicImage, resize: Resize, format: InputFormat) -> PreparedImage {
    let original = (img.width(), img.height());
    let resized = resize.target_size(original.0, original.1);
    let img = img.resize_exact(resized.0, resized.1, imageops::FilterType::Triangle);

    PreparedImage {
        tensor: to_chw_tensor(&img, format),
        original,
        resized,
    }
}

/// `(3, H, W)` float tensor in the channel order the model expects.
pub fn to_chw_tensor(img: &image::DynamicImage, format: InputFormat) -> Array3<f32> {
    let img_rgb8 = img.to_rgb8();
    let (width, height) = img_rgb8.dimensions();

    let mut input = Array3::zeros((3, height as usize, width as usize));

    let channels = match format {
        InputFormat::Rgb => [0, 1, 2],
        InputFormat::Bgr => [2, 1, 0],
    };

    for pixel in img_rgb8.enumerate_pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        for (value, c) in pixel.2 .0.iter().zip(channels) {
            input[[c, y, x]] = *value as f32;
        }
    }

    input
}
