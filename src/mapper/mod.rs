//! Result rows and their materialization into entities

mod materialize;

pub use materialize::{materialize_erased, EntityMapper};

use sea_query::Value;

/// One result row: column aliases and values in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    /// Builder form of `push`.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn first(&self) -> Option<&(String, Value)> {
        self.columns.first()
    }

    pub fn columns(&self) -> impl Iterator<Item = &(String, Value)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether any column carries the `"<alias> "` prefix.
    pub fn has_alias(&self, alias: &str) -> bool {
        self.columns
            .iter()
            .any(|(column, _)| ColumnValue::parse(column).table.as_deref() == Some(alias))
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Row {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A parsed result column alias: either a bare column name or
/// `"<Table> <Column>"`, split on the first space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnValue {
    pub column: String,
    pub table: Option<String>,
}

impl ColumnValue {
    pub fn parse(alias: &str) -> Self {
        match alias.split_once(' ') {
            Some((table, column)) => ColumnValue {
                column: column.to_string(),
                table: Some(table.to_string()),
            },
            None => ColumnValue {
                column: alias.to_string(),
                table: None,
            },
        }
    }

    pub fn has_table_qualifier(&self) -> bool {
        self.table.is_some()
    }

    /// The alias under which `column` of the entity aliased `table` is selected.
    pub fn alias(table: Option<&str>, column: &str) -> String {
        match table {
            Some(table) => format!("{} {}", table, column),
            None => column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_qualified() {
        let bare = ColumnValue::parse("Name");
        assert_eq!(bare.column, "Name");
        assert!(!bare.has_table_qualifier());

        let qualified = ColumnValue::parse("Parent Name");
        assert_eq!(qualified.table.as_deref(), Some("Parent"));
        assert_eq!(qualified.column, "Name");
        assert!(qualified.has_table_qualifier());

        // Only the first space separates
        let spaced = ColumnValue::parse("Parent Display Name");
        assert_eq!(spaced.column, "Display Name");
    }

    #[test]
    fn test_row_lookup_keeps_order() {
        let row = Row::new()
            .with("Id", Value::Int(Some(1)))
            .with("Parent Id", Value::Int(Some(2)));
        assert_eq!(row.get("Parent Id"), Some(&Value::Int(Some(2))));
        assert_eq!(row.first().map(|(k, _)| k.as_str()), Some("Id"));
        assert!(row.has_alias("Parent"));
        assert!(!row.has_alias("Child"));
    }
}
