//! AgencyDesk Table - generic list table for entity records
//!
//! Client-side search, 1-based pagination, per-page selection and row actions
//! over any serializable row type. Changing the search query does not reset
//! the page here; [`ListTable::set_query`] does that for hosts that want it.

pub mod column;
pub mod query;
pub mod selection;
pub mod view;

pub use column::{render_cell, Align, CellKind, Column};
pub use query::{filter, matches, page, page_count};
pub use selection::Selection;
pub use view::{ListTable, RowAction};

/// A row with a stable identifier
pub trait TableRow {
    fn row_id(&self) -> String;
}

impl TableRow for serde_json::Value {
    fn row_id(&self) -> String {
        match self.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}
