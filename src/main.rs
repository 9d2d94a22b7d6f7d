use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use doclayout_ort::models::{initialize_model, Detectron2Model, Detectron2PretrainedModel};
use doclayout_ort::render::PdfiumRasterizer;
use doclayout_ort::{BatchPredictor, LayoutDetector, Pipeline, PipelineOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Pretrained {
    FasterRcnn,
    MaskRcnn,
}

impl From<Pretrained> for Detectron2PretrainedModel {
    fn from(p: Pretrained) -> Self {
        match p {
            Pretrained::FasterRcnn => Detectron2PretrainedModel::FASTER_RCNN_R_50_FPN_3X,
            Pretrained::MaskRcnn => Detectron2PretrainedModel::MASK_RCNN_X_101_32X8D_FPN_3x,
        }
    }
}

/// Detect, order and export the layout of every PDF in a directory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Model config (YAML)
    #[arg(long, requires = "weights", conflicts_with = "pretrained")]
    config: Option<PathBuf>,

    /// Model weights (ONNX)
    #[arg(long, requires = "config")]
    weights: Option<PathBuf>,

    /// Download a pretrained model from Hugging Face instead of --config/--weights
    #[arg(long, value_enum)]
    pretrained: Option<Pretrained>,

    /// Detection score threshold
    #[arg(long, default_value_t = 0.7)]
    threshold: f32,

    #[arg(long, default_value = "./resources/pdfs/")]
    docs_dir: PathBuf,

    #[arg(long, default_value = "./output/")]
    out_dir: PathBuf,

    /// Rasterization resolution
    #[arg(long, default_value_t = PdfiumRasterizer::DEFAULT_DPI)]
    dpi: f32,

    /// Use the batch predictor
    #[arg(long)]
    batch: bool,

    #[arg(long, default_value_t = 1)]
    batch_size: usize,

    /// Preprocessing threads of the batch predictor
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Save page images with the detected boxes drawn on them
    #[arg(long)]
    visualize: bool,

    /// Group regions under their titles
    #[arg(long)]
    segment_sections: bool,

    /// Do not save figure and table crops
    #[arg(long)]
    no_crops: bool,

    /// Read the text of text, title and list regions with Tesseract
    #[arg(long)]
    ocr: bool,
}

/// `time | LEVEL: message`
struct LogFormat;

impl<S, N> FormatEvent<S, N> for LogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        SystemTime.format_time(&mut writer)?;
        write!(writer, " | {}: ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn load_model(args: &Args) -> Result<Detectron2Model> {
    match (&args.config, &args.weights, args.pretrained) {
        (Some(config), Some(weights), _) => {
            let (model, _metadata) = initialize_model(config, weights, args.threshold)
                .with_context(|| format!("loading model {}", weights.display()))?;
            Ok(model)
        }
        (_, _, Some(pretrained)) => {
            let pretrained = Detectron2PretrainedModel::from(pretrained);
            let config = pretrained
                .model_config()
                .with_score_threshold(args.threshold)?;
            Detectron2Model::configure_pretrained(pretrained, config)
                .with_context(|| format!("loading pretrained model {}", pretrained.name()))
        }
        _ => bail!("either --config and --weights or --pretrained is required"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .event_format(LogFormat)
        .init();

    let args = Args::parse();

    let model = load_model(&args)?;
    let rasterizer = PdfiumRasterizer::new(args.dpi).context("binding pdfium")?;

    let options = PipelineOptions {
        use_batch_predictor: args.batch,
        batch_size: args.batch_size,
        workers: args.workers,
        visualize: args.visualize,
        segment_sections: args.segment_sections,
        crop_figures: !args.no_crops,
        ..PipelineOptions::default()
    };

    let batch_predictor;
    let detector: &dyn LayoutDetector = if options.use_batch_predictor {
        batch_predictor = BatchPredictor::new(model, options.batch_size, options.workers)?;
        &batch_predictor
    } else {
        &model
    };

    let mut pipeline = Pipeline::new(&rasterizer, detector, options);
    if args.ocr {
        pipeline = with_ocr(pipeline)?;
    }

    let reports = pipeline.run(&args.docs_dir, &args.out_dir)?;
    let regions: usize = reports.iter().map(|r| r.regions).sum();
    tracing::info!(
        "Processed {} document(s), {} region(s), output in {}",
        reports.len(),
        regions,
        args.out_dir.display()
    );

    Ok(())
}

#[cfg(feature = "ocr")]
fn with_ocr(pipeline: Pipeline<'_>) -> Result<Pipeline<'_>> {
    let agent = doclayout_ort::ocr::TesseractAgent::new().context("initializing tesseract")?;
    Ok(pipeline.with_text_extractor(Box::new(agent)))
}

#[cfg(not(feature = "ocr"))]
fn with_ocr(_pipeline: Pipeline<'_>) -> Result<Pipeline<'_>> {
    bail!("--ocr needs a build with the `ocr` feature")
}
