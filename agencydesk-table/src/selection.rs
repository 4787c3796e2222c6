//! Row selection by identifier

use crate::TableRow;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one row; returns whether it is selected afterwards
    pub fn toggle(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Select exactly the rows currently visible, not the whole filtered set
    pub fn select_all_visible<R: TableRow>(&mut self, visible: &[&R]) {
        self.ids = visible.iter().map(|row| row.row_id()).collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_toggle() {
        let mut selection = Selection::new();
        assert!(selection.toggle("1"));
        assert!(selection.contains("1"));
        assert!(!selection.toggle("1"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_all_replaces_previous_selection() {
        let rows = [json!({"id": 1}), json!({"id": "b"})];
        let visible: Vec<&serde_json::Value> = rows.iter().collect();

        let mut selection = Selection::new();
        selection.toggle("stale");
        selection.select_all_visible(&visible);

        assert_eq!(selection.ids().collect::<Vec<_>>(), vec!["1", "b"]);
    }
}
