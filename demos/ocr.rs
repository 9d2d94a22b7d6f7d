use doclayout_ort::{
    models::{Detectron2Model, Detectron2PretrainedModel},
    ocr::{TesseractAgent, TextExtractor},
    Result,
};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/data/paper-example.png".to_string());
    let img = image::open(path)?;

    let model = Detectron2Model::pretrained(Detectron2PretrainedModel::FASTER_RCNN_R_50_FPN_3X)?;

    let predictions = model.predict(&img)?;

    let mut agent = TesseractAgent::new()?;

    for pred in predictions.iter().filter(|e| e.class_name() == "text") {
        let crop = pred.padded(5.0).crop_from_image(&img);
        println!("{:?}", agent.extract_text(&crop)?);
    }

    Ok(())
}
