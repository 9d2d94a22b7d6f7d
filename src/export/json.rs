use serde::Serialize;

use crate::document::{Document, Region, Section};
use crate::error::Result;

#[derive(Serialize)]
struct DocumentLayout<'a> {
    source: String,
    pages: Vec<PageLayout<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sections: Option<&'a [Section]>,
}

#[derive(Serialize)]
struct PageLayout<'a> {
    page: usize,
    width: u32,
    height: u32,
    regions: &'a [Region],
}

/// Pretty-printed JSON of every page's regions in reading order.
pub fn to_json(document: &Document, sections: Option<&[Section]>) -> Result<String> {
    let layout = DocumentLayout {
        source: document
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        pages: document
            .pages()
            .iter()
            .map(|page| PageLayout {
                page: page.number,
                width: page.width,
                height: page.height,
                regions: &page.regions,
            })
            .collect(),
        sections,
    };

    Ok(serde_json::to_string_pretty(&layout)?)
}
