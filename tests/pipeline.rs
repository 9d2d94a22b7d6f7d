use std::fs;
use std::path::Path;

use doclayout_ort::batch::ImagePredictor;
use doclayout_ort::image::{DynamicImage, Rgb, RgbImage};
use doclayout_ort::render::PageRasterizer;
use doclayout_ort::{
    BatchPredictor, Error, LayoutDetector, Pipeline, PipelineOptions, Prediction, Result,
};
use serde_json::Value;

/// Pretends every file is a PDF with the given number of letter-sized pages.
/// Files whose name contains "corrupt" fail to load.
struct FakePdf {
    pages: usize,
}

impl PageRasterizer for FakePdf {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>> {
        if path.to_string_lossy().contains("corrupt") {
            return Err(Error::Render(format!("cannot parse {}", path.display())));
        }
        Ok((0..self.pages)
            .map(|_| DynamicImage::new_rgb8(612, 792))
            .collect())
    }
}

struct NothingAboveThreshold;

impl LayoutDetector for NothingAboveThreshold {
    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<Prediction>>> {
        Ok(vec![vec![]; images.len()])
    }
}

/// A two-column page with a title and a figure.
struct TwoColumns;

impl ImagePredictor for TwoColumns {
    type Input = (u32, u32);

    fn prepare(&self, img: &DynamicImage) -> (u32, u32) {
        (img.width(), img.height())
    }

    fn infer(&self, (w, h): (u32, u32)) -> Result<Vec<Prediction>> {
        let (w, h) = (w as f32, h as f32);
        Ok(vec![
            Prediction::from_corners(0.55 * w, 0.1 * h, 0.95 * w, 0.5 * h, 0.9, "text"),
            Prediction::from_corners(0.05 * w, 0.1 * h, 0.45 * w, 0.5 * h, 0.9, "text"),
            Prediction::from_corners(0.1 * w, 0.02 * h, 0.9 * w, 0.07 * h, 0.95, "title"),
            Prediction::from_corners(0.1 * w, 0.6 * h, 0.9 * w, 0.9 * h, 0.8, "figure"),
        ])
    }
}

/// Fails the session run on pages that are entirely white, the way exported
/// Detectron2 graphs do when there is nothing to propose.
struct NoProposalsOnBlank;

impl ImagePredictor for NoProposalsOnBlank {
    type Input = bool;

    fn prepare(&self, img: &DynamicImage) -> bool {
        img.to_luma8().pixels().all(|p| p.0[0] == 255)
    }

    fn infer(&self, blank: bool) -> Result<Vec<Prediction>> {
        if blank {
            return Err(Error::NoProposals(
                "Non-zero status code returned while running Gather node".to_string(),
            ));
        }
        Ok(vec![Prediction::from_corners(10.0, 10.0, 600.0, 100.0, 0.9, "text")])
    }
}

struct WhitePdf;

impl PageRasterizer for WhitePdf {
    fn rasterize(&self, _path: &Path) -> Result<Vec<DynamicImage>> {
        let white = RgbImage::from_pixel(612, 792, Rgb([255, 255, 255]));
        Ok(vec![DynamicImage::ImageRgb8(white)])
    }
}

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"%PDF-1.4").unwrap();
}

fn output_files(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return vec![];
    }
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn empty_directory_produces_nothing() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    touch(docs.path(), "readme.txt");

    let mut pipeline = Pipeline::new(
        &FakePdf { pages: 1 },
        &NothingAboveThreshold,
        PipelineOptions::default(),
    );
    let reports = pipeline.run(docs.path(), out.path()).unwrap();

    assert!(reports.is_empty());
    assert!(output_files(out.path()).is_empty());
}

#[test]
fn blank_page_still_gets_json_and_html() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    touch(docs.path(), "blank.pdf");

    let mut pipeline = Pipeline::new(
        &FakePdf { pages: 1 },
        &NothingAboveThreshold,
        PipelineOptions::default(),
    );
    let reports = pipeline.run(docs.path(), out.path()).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].pages, 1);
    assert_eq!(reports[0].regions, 0);
    assert_eq!(output_files(out.path()), ["blank.html", "blank.json"]);

    let json: Value = serde_json::from_str(&fs::read_to_string(&reports[0].json).unwrap()).unwrap();
    assert_eq!(json["pages"][0]["regions"], Value::Array(vec![]));
    let html = fs::read_to_string(&reports[0].html).unwrap();
    assert!(html.contains("<main>"));
}

#[test]
fn batch_predictor_keeps_going_on_a_blank_page() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    touch(docs.path(), "blank.pdf");

    let detector = BatchPredictor::new(NoProposalsOnBlank, 2, 1).unwrap();
    let options = PipelineOptions {
        use_batch_predictor: true,
        ..PipelineOptions::default()
    };
    let mut pipeline = Pipeline::new(&WhitePdf, &detector, options);

    let reports = pipeline.run(docs.path(), out.path()).unwrap();

    assert_eq!(reports[0].pages, 1);
    assert_eq!(reports[0].regions, 0);
    assert_eq!(output_files(out.path()), ["blank.html", "blank.json"]);
}

#[test]
fn batch_predictor_drives_the_whole_pipeline() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    touch(docs.path(), "paper.pdf");

    let detector = BatchPredictor::new(TwoColumns, 2, 2).unwrap();
    let options = PipelineOptions {
        use_batch_predictor: true,
        visualize: true,
        segment_sections: true,
        ..PipelineOptions::default()
    };
    let mut pipeline = Pipeline::new(&FakePdf { pages: 3 }, &detector, options);

    let reports = pipeline.run(docs.path(), out.path()).unwrap();

    assert_eq!(reports[0].pages, 3);
    assert_eq!(reports[0].regions, 12);
    assert_eq!(
        output_files(out.path()),
        ["paper.html", "paper.json", "paper_assets", "paper_pages"]
    );
    assert_eq!(output_files(&out.path().join("paper_pages")).len(), 3);
    assert_eq!(output_files(&out.path().join("paper_assets")).len(), 3);

    let json: Value = serde_json::from_str(&fs::read_to_string(&reports[0].json).unwrap()).unwrap();
    let order: Vec<_> = json["pages"][0]["regions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["class_name"].as_str().unwrap(), r["x"].as_f64().unwrap() < 306.0))
        .collect();
    assert_eq!(
        order,
        [("title", true), ("text", true), ("text", false), ("figure", true)]
    );
    assert_eq!(json["sections"].as_array().unwrap().len(), 3);
    assert_eq!(json["pages"][0]["regions"][3]["asset"], "paper_assets/page1_region3.png");
}

#[test]
fn corrupt_document_aborts_the_run() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    touch(docs.path(), "a.pdf");
    touch(docs.path(), "b-corrupt.pdf");
    touch(docs.path(), "c.pdf");

    let mut pipeline = Pipeline::new(
        &FakePdf { pages: 1 },
        &NothingAboveThreshold,
        PipelineOptions::default(),
    );
    let err = pipeline.run(docs.path(), out.path()).unwrap_err();

    match err {
        Error::Document { path, source } => {
            assert!(path.ends_with("b-corrupt.pdf"));
            assert!(matches!(*source, Error::Render(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(output_files(out.path()), ["a.html", "a.json"]);
}
