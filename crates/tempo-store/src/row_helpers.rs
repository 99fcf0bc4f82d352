use crate::error::StoreError;

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Get an optional column value.
pub fn get_opt<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<T>, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn get_reports_table_and_column() {
        let conn = Connection::open_in_memory().unwrap();
        let result: Result<Result<i64, StoreError>, _> = conn.query_row("SELECT 'text'", [], |row| {
            Ok(get::<i64>(row, 0, "tasks", "position"))
        });
        let inner = result.unwrap();
        assert!(matches!(
            inner,
            Err(StoreError::CorruptRow { table: "tasks", column: "position", .. })
        ));
    }

    #[test]
    fn get_opt_returns_none_for_null() {
        let conn = Connection::open_in_memory().unwrap();
        let result: Option<String> = conn
            .query_row("SELECT NULL", [], |row| {
                Ok(get_opt::<String>(row, 0, "tasks", "title").unwrap())
            })
            .unwrap();
        assert!(result.is_none());
    }
}
