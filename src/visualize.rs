use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::metadata::LayoutClass;
use crate::Prediction;

const BORDER: i32 = 3;

fn class_color(class: Option<LayoutClass>) -> Rgb<u8> {
    match class {
        Some(LayoutClass::Text) => Rgb([31, 119, 180]),
        Some(LayoutClass::Title) => Rgb([214, 39, 40]),
        Some(LayoutClass::List) => Rgb([44, 160, 44]),
        Some(LayoutClass::Table) => Rgb([255, 127, 14]),
        Some(LayoutClass::Figure) => Rgb([148, 103, 189]),
        None => Rgb([127, 127, 127]),
    }
}

/// Draws every prediction as a colored outline on a copy of `img`.
pub fn draw_predictions(img: &DynamicImage, predictions: &[Prediction]) -> RgbImage {
    let mut canvas = img.to_rgb8();

    for prediction in predictions {
        let color = class_color(prediction.layout_class());
        let (x, y) = (prediction.x().round() as i32, prediction.y().round() as i32);
        let (w, h) = (
            prediction.width().round() as i32,
            prediction.height().round() as i32,
        );

        for inset in 0..BORDER {
            let (rw, rh) = (w - 2 * inset, h - 2 * inset);
            if rw <= 0 || rh <= 0 {
                break;
            }
            let rect = Rect::at(x + inset, y + inset).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlines_are_drawn_in_the_class_color() {
        let img = DynamicImage::new_rgb8(50, 50);
        let predictions = [Prediction::from_corners(10.0, 10.0, 40.0, 30.0, 0.9, "title")];

        let canvas = draw_predictions(&img, &predictions);

        let title = class_color(Some(LayoutClass::Title));
        assert_eq!(*canvas.get_pixel(10, 10), title);
        assert_eq!(*canvas.get_pixel(12, 20), title);
        assert_eq!(*canvas.get_pixel(25, 20), Rgb([0, 0, 0]));
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let img = DynamicImage::new_rgb8(20, 20);
        let predictions = [Prediction::from_corners(5.0, 5.0, 5.0, 15.0, 0.9, "text")];
        let canvas = draw_predictions(&img, &predictions);
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
