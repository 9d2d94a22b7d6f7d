//! Batched inference over many page images.
//!
//! Images are grouped into fixed-size batches. Each batch is preprocessed in
//! parallel on a dedicated pool of `workers` threads, then run through the
//! model one image at a time. Results come back lazily and in input order.

use image::DynamicImage;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::models::Detectron2Model;
use crate::transforms::PreparedImage;
use crate::Prediction;

/// The two halves of a detector the batch predictor drives separately.
pub trait ImagePredictor: Sync {
    type Input: Send;

    /// Preprocessing. Runs on the worker pool.
    fn prepare(&self, img: &DynamicImage) -> Self::Input;

    /// Inference on one prepared image. Runs on the calling thread.
    fn infer(&self, input: Self::Input) -> Result<Vec<Prediction>>;
}

impl ImagePredictor for Detectron2Model {
    type Input = PreparedImage;

    fn prepare(&self, img: &DynamicImage) -> PreparedImage {
        Detectron2Model::prepare(self, img)
    }

    fn infer(&self, input: PreparedImage) -> Result<Vec<Prediction>> {
        Detectron2Model::infer(self, input)
    }
}

pub struct BatchPredictor<P: ImagePredictor> {
    predictor: P,
    batch_size: usize,
    pool: Option<rayon::ThreadPool>,
}

impl<P: ImagePredictor> BatchPredictor<P> {
    /// `workers == 0` preprocesses on the calling thread.
    pub fn new(predictor: P, batch_size: usize, workers: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".to_string()));
        }

        let pool = if workers > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("preprocess-{i}"))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            predictor,
            batch_size,
            pool,
        })
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Predictions for each image, computed batch by batch as the iterator
    /// is consumed. An image without proposals gets an empty list. Any other
    /// inference error is yielded and ends the iteration.
    pub fn predict<'a>(&'a self, images: &'a [DynamicImage]) -> BatchPredictions<'a, P> {
        BatchPredictions {
            batch_predictor: self,
            batches: images.chunks(self.batch_size),
            pending: Vec::new().into_iter(),
            next_index: 0,
            done: false,
        }
    }

    fn collate(&self, batch: &[DynamicImage]) -> Vec<P::Input> {
        match &self.pool {
            Some(pool) => pool.install(|| {
                batch
                    .par_iter()
                    .map(|img| self.predictor.prepare(img))
                    .collect()
            }),
            None => batch.iter().map(|img| self.predictor.prepare(img)).collect(),
        }
    }
}

pub struct BatchPredictions<'a, P: ImagePredictor> {
    batch_predictor: &'a BatchPredictor<P>,
    batches: std::slice::Chunks<'a, DynamicImage>,
    pending: std::vec::IntoIter<P::Input>,
    next_index: usize,
    done: bool,
}

impl<P: ImagePredictor> Iterator for BatchPredictions<'_, P> {
    type Item = Result<Vec<Prediction>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(input) = self.pending.next() {
                let index = self.next_index;
                self.next_index += 1;

                return match self.batch_predictor.predictor.infer(input) {
                    Ok(predictions) => Some(Ok(predictions)),
                    Err(Error::NoProposals(err)) => {
                        tracing::warn!("Image {index} has no proposals, treating it as blank: {err}");
                        Some(Ok(vec![]))
                    }
                    Err(source) => {
                        self.done = true;
                        Some(Err(Error::Inference {
                            index,
                            source: Box::new(source),
                        }))
                    }
                };
            }

            let batch = self.batches.next()?;
            tracing::debug!(
                "Preprocessing batch of {} starting at image {}",
                batch.len(),
                self.next_index
            );
            self.pending = self.batch_predictor.collate(batch).into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Reports each image's width back as the prediction width.
    struct WidthPredictor {
        prepared: AtomicUsize,
        fail_on_width: Option<u32>,
        blank_width: Option<u32>,
    }

    impl WidthPredictor {
        fn new(fail_on_width: Option<u32>) -> Self {
            Self {
                prepared: AtomicUsize::new(0),
                fail_on_width,
                blank_width: None,
            }
        }
    }

    impl ImagePredictor for WidthPredictor {
        type Input = u32;

        fn prepare(&self, img: &DynamicImage) -> u32 {
            self.prepared.fetch_add(1, Ordering::SeqCst);
            img.width()
        }

        fn infer(&self, width: u32) -> Result<Vec<Prediction>> {
            if Some(width) == self.fail_on_width {
                return Err(Error::IncompatibleModel("boom".to_string()));
            }
            if Some(width) == self.blank_width {
                return Err(Error::NoProposals("empty proposal tensor".to_string()));
            }
            Ok(vec![Prediction::from_corners(0.0, 0.0, width as f32, 1.0, 0.9, "text")])
        }
    }

    fn images(widths: &[u32]) -> Vec<DynamicImage> {
        widths.iter().map(|w| DynamicImage::new_rgb8(*w, 2)).collect()
    }

    #[test]
    fn yields_one_list_per_image_in_order() {
        let images = images(&[1, 2, 3, 4, 5]);
        let predictor = BatchPredictor::new(WidthPredictor::new(None), 2, 3).unwrap();

        let widths: Vec<f32> = predictor
            .predict(&images)
            .map(|r| r.unwrap()[0].width())
            .collect();

        assert_eq!(widths, [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn preprocesses_one_batch_at_a_time() {
        let images = images(&[1, 2, 3, 4, 5]);
        let predictor = BatchPredictor::new(WidthPredictor::new(None), 2, 0).unwrap();

        let mut predictions = predictor.predict(&images);
        assert_eq!(predictor.predictor().prepared.load(Ordering::SeqCst), 0);

        predictions.next().unwrap().unwrap();
        assert_eq!(predictor.predictor().prepared.load(Ordering::SeqCst), 2);

        predictions.next().unwrap().unwrap();
        predictions.next().unwrap().unwrap();
        assert_eq!(predictor.predictor().prepared.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn inference_error_ends_the_iteration() {
        let images = images(&[1, 2, 3, 4]);
        let predictor = BatchPredictor::new(WidthPredictor::new(Some(2)), 4, 2).unwrap();

        let results: Vec<_> = predictor.predict(&images).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Inference { index: 1, .. })));
    }

    #[test]
    fn image_without_proposals_is_blank() {
        let images = images(&[1, 2, 3]);
        let mut inner = WidthPredictor::new(None);
        inner.blank_width = Some(2);
        let predictor = BatchPredictor::new(inner, 2, 1).unwrap();

        let counts: Vec<usize> = predictor
            .predict(&images)
            .map(|r| r.unwrap().len())
            .collect();

        assert_eq!(counts, [1, 0, 1]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let predictor = BatchPredictor::new(WidthPredictor::new(None), 1, 1).unwrap();
        assert_eq!(predictor.predict(&[]).count(), 0);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(BatchPredictor::new(WidthPredictor::new(None), 0, 1).is_err());
    }
}
