//! JSON and HTML renderings of an ordered document.

pub mod html;
pub mod json;
