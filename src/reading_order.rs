//! Reading order of the regions detected on a page.
//!
//! Regions are taken top to bottom. A region crossing the vertical midline of
//! the page spans both columns and closes the current band; inside a band the
//! left column is read before the right one. Within a column, regions whose
//! top edges sit on the same visual line are read left to right.

use itertools::Itertools;

use crate::Prediction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingOrderConfig {
    /// Top edges closer than this fraction of the page height share a line.
    pub line_tolerance: f32,
    /// How far past the midline, as a fraction of the page width, a region
    /// has to reach on both sides to count as spanning.
    pub column_margin: f32,
}

impl Default for ReadingOrderConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 0.01,
            column_margin: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Left,
    Right,
    Spanning,
}

/// Returns the indices of `predictions` in reading order.
pub fn order_regions(
    predictions: &[Prediction],
    page_width: f32,
    page_height: f32,
    config: &ReadingOrderConfig,
) -> Vec<usize> {
    let by_position: Vec<usize> = (0..predictions.len())
        .sorted_by(|&a, &b| {
            let (a, b) = (&predictions[a], &predictions[b]);
            a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x()))
        })
        .collect();

    let tolerance = config.line_tolerance * page_height.max(0.0);

    // Without a usable page width there are no columns to speak of.
    if !(page_width.is_finite() && page_width > 0.0) {
        return visual_rows(predictions, &by_position, tolerance);
    }

    let midline = page_width / 2.0;
    let margin = config.column_margin * page_width;
    let column_of = |p: &Prediction| {
        if p.x() < midline - margin && p.x() + p.width() > midline + margin {
            Column::Spanning
        } else if p.center_x() < midline {
            Column::Left
        } else {
            Column::Right
        }
    };

    let mut order = Vec::with_capacity(predictions.len());
    let mut left = vec![];
    let mut right = vec![];

    for index in by_position {
        match column_of(&predictions[index]) {
            Column::Left => left.push(index),
            Column::Right => right.push(index),
            Column::Spanning => {
                order.extend(visual_rows(predictions, &left, tolerance));
                order.extend(visual_rows(predictions, &right, tolerance));
                left.clear();
                right.clear();
                order.push(index);
            }
        }
    }
    order.extend(visual_rows(predictions, &left, tolerance));
    order.extend(visual_rows(predictions, &right, tolerance));

    order
}

/// Groups `indices` (already sorted top to bottom) into lines and reads each
/// line left to right.
fn visual_rows(predictions: &[Prediction], indices: &[usize], tolerance: f32) -> Vec<usize> {
    let mut rows: Vec<Vec<usize>> = vec![];
    let mut row_top = f32::NEG_INFINITY;

    for &index in indices {
        let top = predictions[index].y();
        match rows.last_mut() {
            Some(row) if top - row_top <= tolerance => row.push(index),
            _ => {
                row_top = top;
                rows.push(vec![index]);
            }
        }
    }

    rows.into_iter()
        .flat_map(|row| {
            row.into_iter()
                .sorted_by(|&a, &b| predictions[a].x().total_cmp(&predictions[b].x()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_W: f32 = 1000.0;
    const PAGE_H: f32 = 1400.0;

    fn region(x: f32, y: f32, w: f32, h: f32, class_name: &str) -> Prediction {
        Prediction::from_corners(x, y, x + w, y + h, 0.9, class_name)
    }

    fn order(predictions: &[Prediction]) -> Vec<usize> {
        order_regions(predictions, PAGE_W, PAGE_H, &ReadingOrderConfig::default())
    }

    #[test]
    fn left_column_before_right_column() {
        let predictions = vec![
            region(550.0, 120.0, 400.0, 200.0, "text"), // right, top
            region(50.0, 400.0, 400.0, 200.0, "text"),  // left, bottom
            region(100.0, 10.0, 800.0, 60.0, "title"),  // spanning
            region(550.0, 380.0, 400.0, 200.0, "text"), // right, bottom
            region(50.0, 100.0, 400.0, 200.0, "text"),  // left, top
        ];

        assert_eq!(order(&predictions), [2, 4, 1, 0, 3]);
    }

    #[test]
    fn spanning_region_closes_the_band() {
        let predictions = vec![
            region(50.0, 100.0, 400.0, 150.0, "text"),
            region(550.0, 110.0, 400.0, 150.0, "text"),
            region(50.0, 300.0, 900.0, 300.0, "figure"),
            region(50.0, 700.0, 400.0, 150.0, "text"),
            region(550.0, 690.0, 400.0, 150.0, "text"),
        ];

        assert_eq!(order(&predictions), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn same_line_reads_left_to_right() {
        let predictions = vec![
            region(250.0, 100.0, 100.0, 40.0, "text"),
            region(20.0, 108.0, 100.0, 40.0, "title"),
            region(20.0, 300.0, 100.0, 40.0, "text"),
        ];

        assert_eq!(order(&predictions), [1, 0, 2]);
    }

    #[test]
    fn unknown_page_width_falls_back_to_lines() {
        let predictions = vec![
            region(600.0, 200.0, 100.0, 40.0, "text"),
            region(20.0, 100.0, 100.0, 40.0, "text"),
            region(600.0, 100.0, 100.0, 40.0, "text"),
        ];

        let order = order_regions(&predictions, 0.0, PAGE_H, &ReadingOrderConfig::default());
        assert_eq!(order, [1, 2, 0]);
    }

    #[test]
    fn result_is_a_permutation() {
        let predictions: Vec<_> = (0..40)
            .map(|i| {
                let i = i as f32;
                region((i * 137.0) % 900.0, (i * 53.0) % 1300.0, 50.0 + (i * 31.0) % 700.0, 40.0, "text")
            })
            .collect();

        let mut order = order(&predictions);
        order.sort_unstable();
        assert_eq!(order, (0..predictions.len()).collect::<Vec<_>>());
    }

    #[test]
    fn empty_page() {
        assert!(order(&[]).is_empty());
    }
}
