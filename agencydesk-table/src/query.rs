//! Search and pagination

use crate::column::scalar_text;
use serde::Serialize;
use serde_json::Value;

/// Case-insensitive substring match over the row's top-level scalar values
pub fn matches<R: Serialize>(row: &R, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    let Ok(Value::Object(fields)) = serde_json::to_value(row) else {
        return false;
    };

    fields.values().any(|value| match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            scalar_text(value).to_lowercase().contains(&needle)
        }
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    })
}

/// Rows matching `query`, in their original order
pub fn filter<'a, R: Serialize>(rows: &'a [R], query: &str) -> Vec<&'a R> {
    rows.iter().filter(|row| matches(*row, query)).collect()
}

/// `ceil(len / page_size)`; a page size of zero counts as one
pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// 1-based page slice. Page 0 is read as page 1; pages past the end are empty.
pub fn page<T>(rows: &[T], page_size: usize, page_number: usize) -> &[T] {
    let size = page_size.max(1);
    let start = (page_number.max(1) - 1).saturating_mul(size);
    if start >= rows.len() {
        return &[];
    }
    let end = start.saturating_add(size).min(rows.len());
    &rows[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_query_keeps_everything() {
        let rows = vec![json!({"name": "a"}), json!({"name": "b"})];
        assert_eq!(filter(&rows, "").len(), 2);
        assert_eq!(filter(&rows, "   ").len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive_over_scalars() {
        let rows = vec![
            json!({"id": 1, "name": "Acme Corp", "tags": ["priority"]}),
            json!({"id": 2, "name": "Globex", "active": true}),
            json!({"id": 31, "name": "Initech"}),
        ];

        assert_eq!(filter(&rows, "ACME").len(), 1);
        assert_eq!(filter(&rows, "true").len(), 1);
        assert_eq!(filter(&rows, "3").len(), 1);
        assert!(filter(&rows, "priority").is_empty());
        assert!(filter(&rows, "zzz").is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 5), 0);
        assert_eq!(page_count(12, 5), 3);
        assert_eq!(page_count(10, 5), 2);
        assert_eq!(page_count(3, 0), 3);
    }

    #[test]
    fn test_page_bounds() {
        let rows: Vec<u32> = (1..=12).collect();
        assert_eq!(page(&rows, 5, 1), &[1, 2, 3, 4, 5]);
        assert_eq!(page(&rows, 5, 0), &[1, 2, 3, 4, 5]);
        assert_eq!(page(&rows, 5, 3), &[11, 12]);
        assert!(page(&rows, 5, 4).is_empty());
        assert!(page(&rows, 5, usize::MAX).is_empty());
    }

    #[test]
    fn test_pages_concatenate_to_dataset() {
        for len in 0..25usize {
            let rows: Vec<usize> = (0..len).collect();
            for size in 1..8 {
                let joined: Vec<usize> = (1..=page_count(len, size))
                    .flat_map(|n| page(&rows, size, n).iter().copied())
                    .collect();
                assert_eq!(joined, rows, "len={} size={}", len, size);
            }
        }
    }
}
