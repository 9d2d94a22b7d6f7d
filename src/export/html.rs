use std::fmt::Write;

use itertools::Itertools;

use crate::document::{Document, Region, Section};
use crate::metadata::LayoutClass;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 0; display: flex; }
nav.toc { position: sticky; top: 0; align-self: flex-start; width: 16rem; max-height: 100vh; overflow-y: auto; padding: 1rem; border-right: 1px solid #ddd; }
main { flex: 1; max-width: 52rem; padding: 1rem 2rem; }
.page-number { color: #888; font-size: 0.8rem; }
.placeholder { color: #aaa; font-style: italic; }
figure img { max-width: 100%; }
";

/// Self-contained HTML page reading the document's regions in order.
///
/// With `sections`, regions are grouped under their titles and a table of
/// contents is added; otherwise the document is laid out page by page.
pub fn to_html(document: &Document, sections: Option<&[Section]>) -> String {
    let mut html = String::new();
    let title = escape(&document.name());

    // Writing to a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n"
    );

    match sections {
        Some(sections) => {
            write_toc(&mut html, document, sections);
            html.push_str("<main>\n");
            let _ = writeln!(html, "<h1>{title}</h1>");
            for (i, section) in sections.iter().enumerate() {
                let _ = writeln!(html, "<section id=\"section-{}\">", i + 1);
                if let Some(heading) = section.heading.and_then(|h| document.region(h)) {
                    write_region(&mut html, heading);
                }
                for region in section.regions.iter().filter_map(|r| document.region(*r)) {
                    write_region(&mut html, region);
                }
                html.push_str("</section>\n");
            }
        }
        None => {
            html.push_str("<main>\n");
            let _ = writeln!(html, "<h1>{title}</h1>");
            for page in document.pages() {
                let _ = writeln!(html, "<section class=\"page\" id=\"page-{}\">", page.number);
                let _ = writeln!(html, "<p class=\"page-number\">Page {}</p>", page.number);
                for region in &page.regions {
                    write_region(&mut html, region);
                }
                html.push_str("</section>\n");
            }
        }
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn write_toc(html: &mut String, document: &Document, sections: &[Section]) {
    html.push_str("<nav class=\"toc\">\n<ul>\n");
    let mut titles = 0;
    for (i, section) in sections.iter().enumerate() {
        let label = match section.heading {
            Some(heading) => {
                titles += 1;
                document
                    .region(heading)
                    .and_then(|r| r.text.as_deref())
                    .map(|t| escape(t.trim()))
                    .unwrap_or_else(|| format!("Title {titles} (page {})", heading.page))
            }
            None => "Untitled".to_string(),
        };
        let _ = writeln!(html, "<li><a href=\"#section-{}\">{label}</a></li>", i + 1);
    }
    html.push_str("</ul>\n</nav>\n");
}

fn write_region(html: &mut String, region: &Region) {
    let p = &region.prediction;
    let class_name = escape(p.class_name());
    let attributes = format!(
        "class=\"region {class_name}\" data-order=\"{}\" data-score=\"{:.3}\" data-bbox=\"{:.1},{:.1},{:.1},{:.1}\"",
        region.order,
        p.score(),
        p.x(),
        p.y(),
        p.width(),
        p.height()
    );
    let placeholder = format!("<span class=\"placeholder\">{class_name}</span>");
    let text = region
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let _ = match region.layout_class() {
        Some(LayoutClass::Title) => writeln!(
            html,
            "<h2 {attributes}>{}</h2>",
            text.map(escape).unwrap_or(placeholder)
        ),
        Some(LayoutClass::Text) => writeln!(
            html,
            "<p {attributes}>{}</p>",
            text.map(escape).unwrap_or(placeholder)
        ),
        Some(LayoutClass::List) => {
            let items = match text {
                Some(text) => text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|l| format!("<li>{}</li>", escape(l)))
                    .collect::<String>(),
                None => format!("<li>{placeholder}</li>"),
            };
            writeln!(html, "<ul {attributes}>{items}</ul>")
        }
        Some(LayoutClass::Table | LayoutClass::Figure) => {
            let image = region
                .asset
                .as_deref()
                .map(|src| format!("<img src=\"{}\" alt=\"{class_name}\">", escape(&encode_path(src))))
                .unwrap_or_default();
            writeln!(
                html,
                "<figure {attributes}>{image}<figcaption>{class_name}</figcaption></figure>"
            )
        }
        None => writeln!(
            html,
            "<div {attributes}>{}</div>",
            text.map(escape).unwrap_or(placeholder)
        ),
    };
}

/// Percent-encodes each segment of a relative path for use in a URL.
fn encode_path(path: &str) -> String {
    path.split('/').map(urlencoding::encode).join("/")
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
