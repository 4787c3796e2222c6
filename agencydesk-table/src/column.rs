//! Column descriptors and cell rendering

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

/// How a cell is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellKind {
    #[default]
    Text,
    Badge,
    Date,
    Icon,
    Actions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Top-level field of the serialized row
    pub key: String,
    pub label: String,
    pub kind: CellKind,
    pub align: Align,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind: CellKind::Text,
            align: Align::Left,
        }
    }

    pub fn kind(mut self, kind: CellKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Action column; its cells are filled from the table's row actions
    pub fn actions(label: impl Into<String>) -> Self {
        Self::new("", label).kind(CellKind::Actions).align(Align::Right)
    }
}

/// Render one cell as plain text. Action cells render empty.
pub fn render_cell<R: Serialize>(row: &R, column: &Column) -> String {
    if column.kind == CellKind::Actions {
        return String::new();
    }

    let value = match serde_json::to_value(row) {
        Ok(Value::Object(mut map)) => map.remove(&column.key).unwrap_or(Value::Null),
        _ => Value::Null,
    };

    match column.kind {
        CellKind::Text | CellKind::Actions => scalar_text(&value),
        CellKind::Badge => match scalar_text(&value) {
            text if text.is_empty() => text,
            text => format!("[{}]", text),
        },
        CellKind::Date => format_date(&value),
        CellKind::Icon => match value {
            Value::Bool(true) => "✓".to_string(),
            Value::Bool(false) => "✗".to_string(),
            other => scalar_text(&other),
        },
    }
}

pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_date(value: &Value) -> String {
    let Value::String(raw) = value else {
        return scalar_text(value);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_kinds() {
        let row = json!({
            "name": "Acme",
            "status": "active",
            "signed_at": "2024-03-05T10:30:00.000000Z",
            "verified": true,
            "budget": 1200.5
        });

        assert_eq!(render_cell(&row, &Column::new("name", "Name")), "Acme");
        assert_eq!(
            render_cell(&row, &Column::new("status", "Status").kind(CellKind::Badge)),
            "[active]"
        );
        assert_eq!(
            render_cell(&row, &Column::new("signed_at", "Signed").kind(CellKind::Date)),
            "2024-03-05"
        );
        assert_eq!(
            render_cell(&row, &Column::new("verified", "OK").kind(CellKind::Icon)),
            "✓"
        );
        assert_eq!(render_cell(&row, &Column::new("budget", "Budget")), "1200.5");
        assert_eq!(render_cell(&row, &Column::new("missing", "?")), "");
    }

    #[test]
    fn test_unparseable_date_is_shown_verbatim() {
        let row = json!({ "due": "next week" });
        let column = Column::new("due", "Due").kind(CellKind::Date);
        assert_eq!(render_cell(&row, &column), "next week");
    }
}
