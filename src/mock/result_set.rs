//! Canned result sets
//!
//! A `ResultSet` is what an expectation hands to the statement that executes
//! it: column names plus rows of positional values. Rows are either held in
//! memory or produced lazily by an iterator, which is then consumed at most
//! once.

use crate::core::value::{ArrayData, ArrayKey, Val};
use crate::pdo::error::PdoError;
use std::fmt;

enum Rows {
    Materialized(Vec<Vec<Val>>),
    Lazy(Box<dyn Iterator<Item = Vec<Val>>>),
}

pub struct ResultSet {
    columns: Vec<String>,
    rows: Rows,
}

impl ResultSet {
    /// Empty result set with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Rows::Materialized(Vec::new()),
        }
    }

    /// Replace the rows with positional tuples
    pub fn with_rows<R, V>(mut self, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = V>,
        V: Into<Val>,
    {
        self.rows = Rows::Materialized(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        );
        self
    }

    /// Append one positional row; turns a lazy set into a materialized one
    pub fn add_row<V: Into<Val>>(mut self, row: impl IntoIterator<Item = V>) -> Self {
        let mut rows = self.drain();
        rows.push(row.into_iter().map(Into::into).collect());
        self.rows = Rows::Materialized(rows);
        self
    }

    /// Rows produced on demand, e.g. from a generator-like closure
    pub fn lazy<I, S, It>(columns: I, rows: It) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        It: Iterator<Item = Vec<Val>> + 'static,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Rows::Lazy(Box::new(rows)),
        }
    }

    /// Build from associative rows; column names come from the first row's keys
    /// and every later row must carry exactly the same keys, in any order
    pub fn from_rows(rows: impl IntoIterator<Item = ArrayData>) -> Result<Self, PdoError> {
        let mut keys: Vec<ArrayKey> = Vec::new();
        let mut tuples = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            if i == 0 {
                keys = row.keys().cloned().collect();
            } else if row.len() != keys.len() {
                return Err(row_keys_error(i));
            }
            let tuple = keys
                .iter()
                .map(|key| row.map.get(key).cloned().ok_or_else(|| row_keys_error(i)))
                .collect::<Result<Vec<_>, _>>()?;
            tuples.push(tuple);
        }
        Ok(Self {
            columns: keys.iter().map(column_name).collect(),
            rows: Rows::Materialized(tuples),
        })
    }

    /// JSON fixture: either an array of objects, or
    /// `{"columns": [...], "rows": [[...], ...]}`
    pub fn from_json(json: &str) -> Result<Self, PdoError> {
        let parsed: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| PdoError::InvalidArgument(format!("Invalid result set JSON: {}", e)))?;

        match Val::from(parsed) {
            Val::Array(arr) if arr.get("columns").is_some() || arr.get("rows").is_some() => {
                let columns = match arr.get("columns") {
                    Some(Val::Array(cols)) => cols.values().map(Val::to_php_string).collect(),
                    Some(_) => return Err(json_shape_error()),
                    None => Vec::new(),
                };
                let mut rows = Vec::new();
                if let Some(value) = arr.get("rows") {
                    let Val::Array(list) = value else {
                        return Err(json_shape_error());
                    };
                    for row in list.values() {
                        match row {
                            Val::Array(cells) => rows.push(cells.values().cloned().collect()),
                            _ => return Err(json_shape_error()),
                        }
                    }
                }
                Ok(Self {
                    columns,
                    rows: Rows::Materialized(rows),
                })
            }
            Val::Array(list) => {
                let mut rows = Vec::with_capacity(list.len());
                for row in list.values() {
                    match row {
                        Val::Array(assoc) => rows.push(assoc.clone()),
                        _ => return Err(json_shape_error()),
                    }
                }
                Self::from_rows(rows)
            }
            _ => Err(json_shape_error()),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows, unknown for lazy sets
    pub fn row_count(&self) -> Option<usize> {
        match &self.rows {
            Rows::Materialized(rows) => Some(rows.len()),
            Rows::Lazy(_) => None,
        }
    }

    fn drain(&mut self) -> Vec<Vec<Val>> {
        match std::mem::replace(&mut self.rows, Rows::Materialized(Vec::new())) {
            Rows::Materialized(rows) => rows,
            Rows::Lazy(iter) => iter.collect(),
        }
    }

    /// Cursor over the rows, consuming the set
    pub fn into_cursor(self) -> RowIterator {
        let rows: Box<dyn Iterator<Item = Vec<Val>>> = match self.rows {
            Rows::Materialized(rows) => Box::new(rows.into_iter()),
            Rows::Lazy(iter) => iter,
        };
        RowIterator {
            columns: self.columns,
            rows,
            position: 0,
        }
    }
}

fn column_name(key: &ArrayKey) -> String {
    match key {
        ArrayKey::Int(i) => i.to_string(),
        ArrayKey::Str(s) => s.clone(),
    }
}

fn row_keys_error(index: usize) -> PdoError {
    PdoError::InvalidArgument(format!(
        "Row {} does not have the same keys as the first row",
        index
    ))
}

fn json_shape_error() -> PdoError {
    PdoError::InvalidArgument(
        "Result set JSON must be a list of objects or {\"columns\": [...], \"rows\": [...]}"
            .to_string(),
    )
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ResultSet");
        s.field("columns", &self.columns);
        match &self.rows {
            Rows::Materialized(rows) => s.field("rows", rows),
            Rows::Lazy(_) => s.field("rows", &"<lazy>"),
        };
        s.finish()
    }
}

/// Forward-only cursor over a result set
pub struct RowIterator {
    columns: Vec<String>,
    rows: Box<dyn Iterator<Item = Vec<Val>>>,
    position: usize,
}

impl RowIterator {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows handed out so far
    pub fn rows_read(&self) -> usize {
        self.position
    }

    pub fn next_row(&mut self) -> Option<Vec<Val>> {
        let row = self.rows.next()?;
        self.position += 1;
        Some(row)
    }
}

impl Iterator for RowIterator {
    type Item = Vec<Val>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

impl fmt::Debug for RowIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIterator")
            .field("columns", &self.columns)
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_infers_columns() {
        let rs = ResultSet::from_rows([
            ArrayData::assoc([("id", Val::Int(1)), ("title", Val::from("A"))]),
            ArrayData::assoc([("id", Val::Int(2)), ("title", Val::from("B"))]),
        ])
        .unwrap();
        assert_eq!(rs.columns(), ["id", "title"]);
        assert_eq!(rs.row_count(), Some(2));

        let mut cursor = rs.into_cursor();
        assert_eq!(cursor.next_row(), Some(vec![Val::Int(1), Val::from("A")]));
        assert_eq!(cursor.rows_read(), 1);
    }

    #[test]
    fn test_from_rows_matches_values_by_key() {
        let rs = ResultSet::from_rows([
            ArrayData::assoc([("id", Val::Int(1)), ("title", Val::from("A"))]),
            ArrayData::assoc([("title", Val::from("B")), ("id", Val::Int(2))]),
        ])
        .unwrap();
        let rows: Vec<_> = rs.into_cursor().collect();
        assert_eq!(rows[1], vec![Val::Int(2), Val::from("B")]);
    }

    #[test]
    fn test_from_rows_rejects_mismatched_keys() {
        let missing = ResultSet::from_rows([
            ArrayData::assoc([("id", Val::Int(1)), ("title", Val::from("A"))]),
            ArrayData::assoc([("id", Val::Int(2)), ("name", Val::from("B"))]),
        ]);
        assert!(matches!(missing, Err(PdoError::InvalidArgument(_))));

        let extra = ResultSet::from_rows([
            ArrayData::assoc([("id", Val::Int(1))]),
            ArrayData::assoc([("id", Val::Int(2)), ("title", Val::from("B"))]),
        ]);
        assert!(matches!(extra, Err(PdoError::InvalidArgument(_))));
    }

    #[test]
    fn test_lazy_rows_are_pulled_on_demand() {
        let rs = ResultSet::lazy(["n"], (1..=3).map(|i| vec![Val::Int(i)]));
        assert_eq!(rs.row_count(), None);
        let total: i64 = rs.into_cursor().map(|row| row[0].to_int()).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_add_row_materializes_lazy_set() {
        let rs = ResultSet::lazy(["n"], std::iter::once(vec![Val::Int(1)])).add_row([2]);
        assert_eq!(rs.row_count(), Some(2));
    }

    #[test]
    fn test_from_json_list_of_objects() {
        let rs = ResultSet::from_json(r#"[{"id": 1, "name": "x"}, {"id": 2, "name": null}]"#)
            .unwrap();
        assert_eq!(rs.columns(), ["id", "name"]);
        let rows: Vec<_> = rs.into_cursor().collect();
        assert_eq!(rows[1], vec![Val::Int(2), Val::Null]);
    }

    #[test]
    fn test_from_json_columns_and_rows() {
        let rs = ResultSet::from_json(r#"{"columns": ["a", "b"], "rows": [[1, 2]]}"#).unwrap();
        assert_eq!(rs.columns(), ["a", "b"]);
        assert_eq!(rs.row_count(), Some(1));

        assert!(ResultSet::from_json("42").is_err());
        assert!(ResultSet::from_json("{not json").is_err());
    }
}
