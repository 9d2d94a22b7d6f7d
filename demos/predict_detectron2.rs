use doclayout_ort::{
    models::{Detectron2Model, Detectron2PretrainedModel},
    Result,
};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/data/paper-example.png".to_string());
    let img = image::open(path)?;

    let model = Detectron2Model::pretrained(Detectron2PretrainedModel::FASTER_RCNN_R_50_FPN_3X)?;

    let predictions = model.predict(&img)?;

    println!("{:?}", predictions);

    Ok(())
}
