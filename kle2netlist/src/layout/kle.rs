//! Raw KLE deserializer
//!
//! Walks the array-of-rows format exported by keyboard-layout-editor.com,
//! keeping a cursor whose properties are updated by object items and
//! emitted as a key on every string item.

use serde_json::{Map, Value};
use tracing::debug;

use super::{Key, Layout, LayoutError, LayoutMeta};

/// Label position remapping per alignment flag value.
const LABEL_MAP: [[i8; 12]; 8] = [
    [0, 6, 2, 8, 9, 11, 3, 5, 1, 4, 7, 10],
    [1, 7, -1, -1, 9, 11, 4, -1, -1, -1, -1, 10],
    [3, -1, 5, -1, 9, 11, -1, -1, 4, -1, -1, 10],
    [4, -1, -1, -1, 9, 11, -1, -1, -1, -1, -1, 10],
    [0, 6, 2, 8, 10, -1, 3, 5, 1, 4, 7, -1],
    [1, 7, -1, -1, 10, -1, 4, -1, -1, -1, -1, -1],
    [3, -1, 5, -1, 10, -1, -1, -1, 4, -1, -1, -1],
    [4, -1, -1, -1, 10, -1, -1, -1, -1, -1, -1, -1],
];

const DEFAULT_ALIGN: usize = 4;

#[derive(Debug, Clone)]
struct Cursor {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    x2: f64,
    y2: f64,
    width2: f64,
    height2: f64,
    rotation_x: f64,
    rotation_y: f64,
    rotation_angle: f64,
    align: usize,
    decal: bool,
    ghost: bool,
    stepped: bool,
    nub: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            x2: 0.0,
            y2: 0.0,
            width2: 0.0,
            height2: 0.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_angle: 0.0,
            align: DEFAULT_ALIGN,
            decal: false,
            ghost: false,
            stepped: false,
            nub: false,
        }
    }
}

impl Cursor {
    fn emit(&self, text: &str) -> Key {
        Key {
            labels: reorder_labels(text, self.align),
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            x2: self.x2,
            y2: self.y2,
            width2: if self.width2 == 0.0 { self.width } else { self.width2 },
            height2: if self.height2 == 0.0 { self.height } else { self.height2 },
            rotation_x: self.rotation_x,
            rotation_y: self.rotation_y,
            rotation_angle: self.rotation_angle,
            decal: self.decal,
            ghost: self.ghost,
            stepped: self.stepped,
            nub: self.nub,
        }
    }

    /// Advance past an emitted key and reset the per-key properties.
    fn advance(&mut self) {
        self.x += self.width;
        self.width = 1.0;
        self.height = 1.0;
        self.x2 = 0.0;
        self.y2 = 0.0;
        self.width2 = 0.0;
        self.height2 = 0.0;
        self.decal = false;
        self.stepped = false;
        self.nub = false;
    }

    fn apply(&mut self, props: &Map<String, Value>, first_in_row: bool) -> Result<(), LayoutError> {
        let rotation_given = ["r", "rx", "ry"].iter().any(|k| props.contains_key(*k));
        if rotation_given && !first_in_row {
            return Err(LayoutError::Kle(
                "rotation can only be specified on the first key in a row".to_string(),
            ));
        }

        if let Some(r) = number(props, "r") {
            self.rotation_angle = r;
        }
        if let Some(rx) = number(props, "rx") {
            self.rotation_x = rx;
        }
        if let Some(ry) = number(props, "ry") {
            self.rotation_y = ry;
        }
        if props.contains_key("rx") || props.contains_key("ry") {
            // A rotation cluster moves the cursor to its origin.
            self.x = self.rotation_x;
            self.y = self.rotation_y;
        }
        if let Some(a) = number(props, "a") {
            let a = a as usize;
            if a < LABEL_MAP.len() {
                self.align = a;
            } else {
                debug!("Ignoring unknown label alignment {}", a);
            }
        }
        if let Some(dx) = number(props, "x") {
            self.x += dx;
        }
        if let Some(dy) = number(props, "y") {
            self.y += dy;
        }
        if let Some(w) = number(props, "w").filter(|w| *w != 0.0) {
            self.width = w;
            self.width2 = w;
        }
        if let Some(h) = number(props, "h").filter(|h| *h != 0.0) {
            self.height = h;
            self.height2 = h;
        }
        if let Some(x2) = number(props, "x2") {
            self.x2 = x2;
        }
        if let Some(y2) = number(props, "y2") {
            self.y2 = y2;
        }
        if let Some(w2) = number(props, "w2") {
            self.width2 = w2;
        }
        if let Some(h2) = number(props, "h2") {
            self.height2 = h2;
        }
        if let Some(n) = flag(props, "n") {
            self.nub = n;
        }
        if let Some(l) = flag(props, "l") {
            self.stepped = l;
        }
        if let Some(d) = flag(props, "d") {
            self.decal = d;
        }
        if let Some(g) = flag(props, "g") {
            self.ghost = g;
        }
        Ok(())
    }
}

fn number(props: &Map<String, Value>, key: &str) -> Option<f64> {
    match props.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn flag(props: &Map<String, Value>, key: &str) -> Option<bool> {
    match props.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => Some(n.as_f64().unwrap_or(0.0) != 0.0),
        _ => None,
    }
}

/// Split a key's text on newlines and move each non-empty label to its
/// canonical position for the given alignment.
fn reorder_labels(text: &str, align: usize) -> Vec<Option<String>> {
    let mut labels: Vec<Option<String>> = vec![None; 12];
    for (i, label) in text.split('\n').enumerate().take(12) {
        if label.is_empty() {
            continue;
        }
        let target = LABEL_MAP[align][i];
        if target >= 0 {
            labels[target as usize] = Some(label.to_string());
        }
    }
    while labels.last().is_some_and(|l| l.is_none()) {
        labels.pop();
    }
    labels
}

fn read_meta(props: &Map<String, Value>) -> Result<LayoutMeta, LayoutError> {
    Ok(serde_json::from_value(Value::Object(props.clone()))?)
}

/// Deserialize the rows of a raw KLE layout.
pub fn deserialize_rows(rows: &[Value]) -> Result<Layout, LayoutError> {
    let mut layout = Layout::default();
    let mut cursor = Cursor::default();

    for (r, row) in rows.iter().enumerate() {
        let items = match row {
            Value::Array(items) => items,
            Value::Object(props) if r == 0 => {
                layout.meta = read_meta(props)?;
                continue;
            }
            _ => return Err(LayoutError::Kle("KLE rows must be arrays".to_string())),
        };

        for (k, item) in items.iter().enumerate() {
            match item {
                Value::String(text) => {
                    layout.keys.push(cursor.emit(text));
                    cursor.advance();
                }
                Value::Object(props) => cursor.apply(props, k == 0)?,
                _ => {
                    return Err(LayoutError::Kle(
                        "KLE row items must be objects or strings".to_string(),
                    ))
                }
            }
        }

        cursor.y += 1.0;
        cursor.x = cursor.rotation_x;
    }

    Ok(layout)
}
