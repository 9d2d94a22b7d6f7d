use geo_types::{coord, Rect};
use serde::Serialize;

use crate::metadata::LayoutClass;

/// A detected layout region in page pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    score: f32,
    class_name: String,
}

impl Prediction {
    /// Builds a prediction from the `(x1, y1)` / `(x2, y2)` corners of a box.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_name: &str) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            score,
            class_name: class_name.to_string(),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn layout_class(&self) -> Option<LayoutClass> {
        LayoutClass::from_label(&self.class_name)
    }

    pub fn bbox(&self) -> Rect<f32> {
        Rect::new(
            coord! { x: self.x, y: self.y },
            coord! { x: self.x + self.width, y: self.y + self.height },
        )
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Returns a copy grown by `padding` on every side.
    pub fn padded(&self, padding: f32) -> Self {
        Self {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + 2.0 * padding,
            height: self.height + 2.0 * padding,
            ..self.clone()
        }
    }

    /// Crops the region out of `img`, clamped to the image bounds.
    pub fn crop_from_image(&self, img: &image::DynamicImage) -> image::DynamicImage {
        let x1 = self.x.max(0.0).min(img.width() as f32) as u32;
        let y1 = self.y.max(0.0).min(img.height() as f32) as u32;
        let x2 = (self.x + self.width).max(0.0).min(img.width() as f32) as u32;
        let y2 = (self.y + self.height).max(0.0).min(img.height() as f32) as u32;

        img.crop_imm(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_and_height_come_from_corners() {
        let p = Prediction::from_corners(10.0, 20.0, 110.0, 70.0, 0.9, "text");
        assert_eq!(p.x(), 10.0);
        assert_eq!(p.y(), 20.0);
        assert_eq!(p.width(), 100.0);
        assert_eq!(p.height(), 50.0);
        assert_eq!(p.bbox().max(), coord! { x: 110.0, y: 70.0 });
        assert_eq!(p.layout_class(), Some(LayoutClass::Text));
    }

    #[test]
    fn padding_keeps_the_center() {
        let p = Prediction::from_corners(10.0, 10.0, 30.0, 20.0, 0.9, "figure");
        let padded = p.padded(5.0);
        assert_eq!(padded.bbox().min(), coord! { x: 5.0, y: 5.0 });
        assert_eq!(padded.bbox().max(), coord! { x: 35.0, y: 25.0 });
        assert_eq!(padded.center_x(), p.center_x());
        assert_eq!(padded.class_name(), "figure");
    }

    #[test]
    fn crop_is_clamped_to_the_image() {
        let img = image::DynamicImage::new_rgb8(100, 50);
        let p = Prediction::from_corners(80.0, -10.0, 140.0, 30.0, 0.9, "table");
        let crop = p.crop_from_image(&img);
        assert_eq!((crop.width(), crop.height()), (20, 30));
    }
}
