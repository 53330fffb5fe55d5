//! Keyboard Layouts
//!
//! Keyboard-layout-editor (KLE) input in either of its two JSON shapes: the
//! serialized form (`{"meta": ..., "keys": [...]}`) or the raw array of rows
//! exported by the editor.

pub mod kle;

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Failed to read layout {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid KLE layout: {0}")]
    Kle(String),
}

/// Layout metadata; informational only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMeta {
    pub name: String,
    pub author: String,
    pub notes: String,
    pub background: Option<Value>,
    pub radii: String,
    #[serde(rename = "switchMount")]
    pub switch_mount: String,
    #[serde(rename = "switchBrand")]
    pub switch_brand: String,
    #[serde(rename = "switchType")]
    pub switch_type: String,
}

/// A single key with position and size in key units (u)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SerializedKey")]
pub struct Key {
    pub labels: Vec<Option<String>>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub x2: f64,
    pub y2: f64,
    pub width2: f64,
    pub height2: f64,
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub rotation_angle: f64,
    pub decal: bool,
    pub ghost: bool,
    pub stepped: bool,
    pub nub: bool,
}

impl Default for Key {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            x2: 0.0,
            y2: 0.0,
            width2: 1.0,
            height2: 1.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_angle: 0.0,
            decal: false,
            ghost: false,
            stepped: false,
            nub: false,
        }
    }
}

impl Key {
    /// ISO enter: 1.25u x 2u with a 1.5u x 1u upper part.
    pub fn is_iso_enter(&self) -> bool {
        self.width == 1.25 && self.height == 2.0 && self.width2 == 1.5 && self.height2 == 1.0
    }

    /// The first label with all whitespace removed, `None` when the key has
    /// no labels at all. A null first label yields an empty string.
    pub fn matrix_label(&self) -> Option<String> {
        let first = self.labels.first()?;
        Some(
            first
                .as_deref()
                .unwrap_or_default()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
        )
    }
}

/// Key as written by kle-serial; secondary size defaults to the primary one
#[derive(Deserialize)]
#[serde(default)]
struct SerializedKey {
    #[serde(deserialize_with = "deserialize_labels")]
    labels: Vec<Option<String>>,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    x2: f64,
    y2: f64,
    width2: Option<f64>,
    height2: Option<f64>,
    rotation_x: f64,
    rotation_y: f64,
    rotation_angle: f64,
    decal: bool,
    ghost: bool,
    stepped: bool,
    nub: bool,
}

impl Default for SerializedKey {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            x2: 0.0,
            y2: 0.0,
            width2: None,
            height2: None,
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_angle: 0.0,
            decal: false,
            ghost: false,
            stepped: false,
            nub: false,
        }
    }
}

impl From<SerializedKey> for Key {
    fn from(k: SerializedKey) -> Self {
        Self {
            labels: k.labels,
            x: k.x,
            y: k.y,
            width: k.width,
            height: k.height,
            x2: k.x2,
            y2: k.y2,
            width2: k.width2.unwrap_or(k.width),
            height2: k.height2.unwrap_or(k.height),
            rotation_x: k.rotation_x,
            rotation_y: k.rotation_y,
            rotation_angle: k.rotation_angle,
            decal: k.decal,
            ghost: k.ghost,
            stepped: k.stepped,
            nub: k.nub,
        }
    }
}

/// Labels may be strings, numbers or null; numbers are kept as their text.
fn deserialize_labels<'de, D>(deserializer: D) -> Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect())
}

/// A parsed keyboard layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub meta: LayoutMeta,
    pub keys: Vec<Key>,
}

impl Layout {
    /// Parse either the serialized form or the raw KLE array.
    pub fn from_json_str(json: &str) -> Result<Self, LayoutError> {
        let value: Value = serde_json::from_str(json)?;
        let layout = match value {
            Value::Array(rows) => kle::deserialize_rows(&rows)?,
            Value::Object(_) => serde_json::from_value(value)?,
            _ => {
                return Err(LayoutError::Kle(
                    "layout must be a JSON object or an array of rows".to_string(),
                ))
            }
        };
        debug!("Parsed layout '{}' with {} keys", layout.meta.name, layout.keys.len());
        Ok(layout)
    }

    pub fn from_path(path: &Path) -> Result<Self, LayoutError> {
        let json = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_key_defaults() {
        let layout = Layout::from_json_str(
            r#"{"meta": {"name": "2x2"}, "keys": [{"labels": ["0,0"], "x": 1, "width": 2.25}]}"#,
        )
        .unwrap();
        assert_eq!(layout.meta.name, "2x2");
        let key = &layout.keys[0];
        assert_eq!(key.width, 2.25);
        assert_eq!(key.height, 1.0);
        assert_eq!(key.width2, 2.25);
        assert_eq!(key.height2, 1.0);
    }

    #[test]
    fn test_iso_enter_detection() {
        let iso = Key {
            width: 1.25,
            height: 2.0,
            width2: 1.5,
            height2: 1.0,
            ..Key::default()
        };
        assert!(iso.is_iso_enter());

        let tall = Key {
            width: 1.25,
            height: 2.0,
            width2: 1.25,
            height2: 2.0,
            ..Key::default()
        };
        assert!(!tall.is_iso_enter());
    }

    #[test]
    fn test_matrix_label_strips_whitespace() {
        let key = Key {
            labels: vec![Some(" 1 ,\t2\n".to_string()), Some("Esc".to_string())],
            ..Key::default()
        };
        assert_eq!(key.matrix_label().as_deref(), Some("1,2"));

        let null_first = Key {
            labels: vec![None, Some("1,2".to_string())],
            ..Key::default()
        };
        assert_eq!(null_first.matrix_label().as_deref(), Some(""));
        assert_eq!(Key::default().matrix_label(), None);
    }

    #[test]
    fn test_numeric_labels_are_text() {
        let layout = Layout::from_json_str(r#"{"keys": [{"labels": [12, null]}]}"#).unwrap();
        assert_eq!(layout.keys[0].labels, vec![Some("12".to_string()), None]);
    }

    #[test]
    fn test_rejects_scalar_root() {
        assert!(matches!(Layout::from_json_str("42"), Err(LayoutError::Kle(_))));
        assert!(matches!(Layout::from_json_str("{"), Err(LayoutError::Json(_))));
    }
}
