use serde::Serialize;

use crate::error::{Error, Result};

/// Label set attached to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub thing_classes: Vec<String>,
}

impl Metadata {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            thing_classes: labels.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }

    /// Resolves a class index produced by the model to its label.
    pub fn resolve(&self, class_index: i64) -> Result<&str> {
        usize::try_from(class_index)
            .ok()
            .and_then(|i| self.thing_classes.get(i))
            .map(String::as_str)
            .ok_or(Error::UnknownClass {
                index: class_index,
                len: self.thing_classes.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.thing_classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thing_classes.is_empty()
    }
}

/// The fixed set of region kinds the exports know how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutClass {
    Text,
    Title,
    List,
    Table,
    Figure,
}

impl LayoutClass {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "title" => Some(Self::Title),
            "list" => Some(Self::List),
            "table" => Some(Self::Table),
            "figure" => Some(Self::Figure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Title => "title",
            Self::List => "list",
            Self::Table => "table",
            Self::Figure => "figure",
        }
    }

    /// Regions that carry running text, as opposed to visual content.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Title | Self::List)
    }
}
