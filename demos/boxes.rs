use doclayout_ort::{
    models::{Detectron2Model, Detectron2PretrainedModel},
    reading_order::{order_regions, ReadingOrderConfig},
    visualize, Result,
};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/data/paper-example.png".to_string());
    let img = image::open(path)?;

    let model = Detectron2Model::pretrained(Detectron2PretrainedModel::FASTER_RCNN_R_50_FPN_3X)?;

    let predictions = model.predict(&img)?;
    let order = order_regions(
        &predictions,
        img.width() as f32,
        img.height() as f32,
        &ReadingOrderConfig::default(),
    );

    for (rank, i) in order.iter().enumerate() {
        let pred = &predictions[*i];
        println!(
            "#{rank} Label: {}, Confidence: {}, Box: {:?}",
            pred.class_name(),
            pred.score(),
            pred.bbox()
        );
    }

    visualize::draw_predictions(&img, &predictions).save("boxes.png")?;

    Ok(())
}
