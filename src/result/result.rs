use crate::core::Row;

/// Result set handed back to the caller once an observer responds.
///
/// Columns are derived from the first row's field names, since mock rows
/// carry their own names.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn columns(&self) -> Vec<String> {
        match self.rows.first() {
            Some(row) => row.field_names().iter().map(|name| name.to_string()).collect(),
            None => Vec::new(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rows_from_json;

    #[test]
    fn test_empty_result() {
        let result = QueryResult::empty();
        assert_eq!(result.row_count(), 0);
        assert!(result.is_empty());
        assert!(result.columns().is_empty());
        assert!(result.first_row().is_none());
    }

    #[test]
    fn test_columns_derived_from_first_row() {
        let rows = rows_from_json(serde_json::json!([
            { "foo": "bar", "id": 1 },
            { "foo": "baz", "id": 2 },
        ]))
        .unwrap();
        let result = QueryResult::new(rows);

        assert_eq!(result.row_count(), 2);
        let mut columns = result.columns();
        columns.sort();
        assert_eq!(columns, vec!["foo".to_string(), "id".to_string()]);
    }
}
