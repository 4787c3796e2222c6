//! List table view state and text rendering

use crate::column::{render_cell, Align, CellKind, Column};
use crate::query::{filter, page, page_count};
use crate::selection::Selection;
use crate::TableRow;
use serde::Serialize;
use std::fmt;
use tracing::debug;

type ActionHandler<R> = Box<dyn Fn(&R) + Send + Sync>;

/// Caller-supplied per-row button. No confirmation step is built in.
pub struct RowAction<R> {
    label: String,
    handler: ActionHandler<R>,
}

impl<R> RowAction<R> {
    pub fn new(label: impl Into<String>, handler: impl Fn(&R) + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            handler: Box::new(handler),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn invoke(&self, row: &R) {
        (self.handler)(row)
    }
}

impl<R> fmt::Debug for RowAction<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Rows, columns and the host-side state of one list view
pub struct ListTable<R> {
    rows: Vec<R>,
    columns: Vec<Column>,
    actions: Vec<RowAction<R>>,
    page_size: usize,
    query: String,
    current_page: usize,
    selection: Selection,
}

impl<R: Serialize + TableRow> ListTable<R> {
    pub fn new(rows: Vec<R>, columns: Vec<Column>) -> Self {
        Self {
            rows,
            columns,
            actions: Vec::new(),
            page_size: 10,
            query: String::new(),
            current_page: 1,
            selection: Selection::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_action(mut self, action: RowAction<R>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Update the search query and go back to page 1
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.current_page = 1;
        debug!(query = %self.query, "Table search changed");
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_page(&mut self, page_number: usize) {
        self.current_page = page_number.max(1);
    }

    pub fn filtered(&self) -> Vec<&R> {
        filter(&self.rows, &self.query)
    }

    pub fn page_count(&self) -> usize {
        page_count(self.filtered().len(), self.page_size)
    }

    /// Rows on the current page of the filtered set
    pub fn visible_rows(&self) -> Vec<&R> {
        let filtered = self.filtered();
        page(&filtered, self.page_size, self.current_page).to_vec()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn toggle_row(&mut self, id: &str) -> bool {
        self.selection.toggle(id)
    }

    pub fn select_all_visible(&mut self) {
        let mut selection = Selection::new();
        selection.select_all_visible(&self.visible_rows());
        self.selection = selection;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn action_labels(&self) -> Vec<&str> {
        self.actions.iter().map(RowAction::label).collect()
    }

    /// Run the action labelled `label` against the row with `row_id`.
    /// Returns false when either is unknown.
    pub fn invoke_action(&self, label: &str, row_id: &str) -> bool {
        let Some(action) = self.actions.iter().find(|a| a.label == label) else {
            return false;
        };
        let Some(row) = self.rows.iter().find(|r| r.row_id() == row_id) else {
            return false;
        };
        action.invoke(row);
        true
    }

    /// Plain-text rendering of the current page
    pub fn render(&self) -> String {
        let action_cell = self.action_labels().join(" | ");
        let header: Vec<String> = self.columns.iter().map(|c| c.label.clone()).collect();
        let body: Vec<Vec<String>> = self
            .visible_rows()
            .into_iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| match column.kind {
                        CellKind::Actions => action_cell.clone(),
                        _ => render_cell(row, column),
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = (0..self.columns.len())
            .map(|i| {
                body.iter()
                    .map(|cells| cells[i].chars().count())
                    .chain(std::iter::once(header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&self.render_line(&header, &widths));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.push('\n');
        for cells in &body {
            out.push_str(&self.render_line(cells, &widths));
            out.push('\n');
        }

        let total_pages = self.page_count();
        out.push_str(&format!(
            "Page {} of {} ({} rows)",
            self.current_page,
            total_pages.max(1),
            self.filtered().len()
        ));
        out
    }

    fn render_line(&self, cells: &[String], widths: &[usize]) -> String {
        self.columns
            .iter()
            .zip(cells)
            .zip(widths)
            .map(|((column, cell), width)| pad(cell, *width, column.align))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text, width = width),
        Align::Center => format!("{:^width$}", text, width = width),
        Align::Right => format!("{:>width$}", text, width = width),
    }
}

impl<R> fmt::Debug for ListTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListTable")
            .field("rows", &self.rows.len())
            .field("columns", &self.columns)
            .field("actions", &self.actions)
            .field("page_size", &self.page_size)
            .field("query", &self.query)
            .field("current_page", &self.current_page)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn rows(n: usize) -> Vec<Value> {
        (1..=n)
            .map(|i| json!({"id": i, "name": format!("Client {}", i), "status": "active"}))
            .collect()
    }

    #[test]
    fn test_set_query_resets_page() {
        let mut table = ListTable::new(rows(12), vec![Column::new("name", "Name")])
            .with_page_size(5);
        table.set_page(3);
        table.set_query("client 1");
        assert_eq!(table.current_page(), 1);
        assert_eq!(table.filtered().len(), 4);
    }

    #[test]
    fn test_select_all_visible_keeps_shared_ids() {
        let mut table = ListTable::new(
            vec![
                json!({"name": "No id"}),
                json!({"name": "Also no id"}),
                json!({"id": 4, "name": "Four"}),
                json!({"id": 4, "name": "Four again"}),
            ],
            vec![Column::new("name", "Name")],
        );
        table.select_all_visible();

        assert_eq!(table.selection().len(), 2);
        assert!(table.selection().contains(""));
        assert!(table.selection().contains("4"));
    }

    #[test]
    fn test_invoke_action_passes_row() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let table = ListTable::new(rows(3), vec![Column::actions("")]).with_action(
            RowAction::new("Delete", move |row: &Value| {
                sink.lock().unwrap().push(row["name"].as_str().unwrap().to_string())
            }),
        );

        assert!(table.invoke_action("Delete", "2"));
        assert!(!table.invoke_action("Archive", "2"));
        assert!(!table.invoke_action("Delete", "99"));
        assert_eq!(*seen.lock().unwrap(), vec!["Client 2".to_string()]);
    }

    #[test]
    fn test_render_pads_columns() {
        let table = ListTable::new(
            rows(2),
            vec![
                Column::new("id", "ID").align(Align::Right),
                Column::new("name", "Name"),
                Column::new("status", "Status").kind(CellKind::Badge),
                Column::actions("Actions"),
            ],
        )
        .with_action(RowAction::new("Edit", |_: &Value| {}));

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "ID | Name     | Status   | Actions");
        assert_eq!(lines[2], " 1 | Client 1 | [active] |    Edit");
        assert_eq!(lines.last(), Some(&"Page 1 of 1 (2 rows)"));
    }
}
