//! Document elements produced by the layout partitioner.
//!
//! The shape follows the partitioner's JSON export: every element carries a
//! `type` (its category), optional `text`, and `metadata` with the source
//! page number and, for tables, a bounding polygon in image coordinates.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Element category. Anything the assembler does not handle maps to
/// [`ElementCategory::Other`] and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementCategory {
    PageBreak,
    ListItem,
    NarrativeText,
    Table,
    Text,
    Title,
    #[serde(other)]
    Other,
}

/// One classified unit of document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type", alias = "category")]
    pub category: ElementCategory,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: ElementMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Bounding polygon of an element.
///
/// `points` are `(x, y)` pairs. When `layout_width`/`layout_height` are
/// present they give the size of the coordinate space the points live in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub layout_width: Option<f64>,
    #[serde(default)]
    pub layout_height: Option<f64>,
}

impl Element {
    pub fn new(category: ElementCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: Some(text.into()),
            metadata: ElementMetadata::default(),
        }
    }

    pub fn page_break() -> Self {
        Self {
            category: ElementCategory::PageBreak,
            text: None,
            metadata: ElementMetadata::default(),
        }
    }

    /// A table element located on `page_number` with the given polygon.
    pub fn table(page_number: u32, points: Vec<[f64; 2]>) -> Self {
        Self {
            category: ElementCategory::Table,
            text: None,
            metadata: ElementMetadata {
                page_number: Some(page_number),
                coordinates: Some(Coordinates {
                    points,
                    ..Coordinates::default()
                }),
            },
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Decode elements from a JSON array.
pub fn elements_from_json(json: &str) -> Result<Vec<Element>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read a pre-computed element file (a JSON array of elements).
pub async fn load_elements(path: &Path) -> Result<Vec<Element>, ParseError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ParseError::ElementsUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    elements_from_json(&raw).map_err(|e| ParseError::ElementsUnreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}
