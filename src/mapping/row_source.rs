//! Tabular results
//!
//! `RowSource` is the forward-only cursor handed back by a command executor.
//! `MemoryRowSource` is the buffered implementation used for raw tables,
//! nested graphs and test doubles.

use async_trait::async_trait;
use comfy_table::{presets::UTF8_FULL, Cell, Table};

use crate::core::{Result, Value};

/// Sequential, forward-only cursor over one or more result sets
#[async_trait]
pub trait RowSource: Send {
    fn field_count(&self) -> usize;

    fn column_name(&self, index: usize) -> &str;

    /// Advance to the next row; false once the current set is exhausted
    fn read(&mut self) -> Result<bool>;

    /// Column value of the current row
    fn value(&self, index: usize) -> Option<&Value>;

    /// Move to the next result set; false when there is none
    fn next_result(&mut self) -> Result<bool>;

    async fn read_async(&mut self) -> Result<bool> {
        self.read()
    }

    async fn next_result_async(&mut self) -> Result<bool> {
        self.next_result()
    }

    /// Column names of the current result set
    fn columns(&self) -> Vec<String> {
        (0..self.field_count()).map(|i| self.column_name(i).to_string()).collect()
    }

    /// Position of `name`: exact match first, then case-insensitive
    fn ordinal(&self, name: &str) -> Option<usize> {
        let count = self.field_count();
        (0..count)
            .find(|&i| self.column_name(i) == name)
            .or_else(|| (0..count).find(|&i| self.column_name(i).eq_ignore_ascii_case(name)))
    }
}

/// Fully materialised result set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Drain the current result set of `source`
    pub fn load(source: &mut dyn RowSource) -> Result<Self> {
        let mut table = Self::new(source.columns(), Vec::new());
        while source.read()? {
            table.rows.push(Self::current_row(source));
        }
        Ok(table)
    }

    pub async fn load_async(source: &mut dyn RowSource) -> Result<Self> {
        let mut table = Self::new(source.columns(), Vec::new());
        while source.read_async().await? {
            table.rows.push(Self::current_row(source));
        }
        Ok(table)
    }

    fn current_row(source: &dyn RowSource) -> Vec<Value> {
        (0..source.field_count())
            .map(|i| source.value(i).cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at `row` in the column named `column`
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(index)
    }

    /// Render as a text table
    #[must_use]
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(self.columns.iter().map(Cell::new));
        for row in &self.rows {
            table.add_row(row.iter().map(Cell::new));
        }
        table.to_string()
    }
}

/// Every result set of a command, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub tables: Vec<DataTable>,
}

impl DataSet {
    pub fn load(source: &mut dyn RowSource) -> Result<Self> {
        let mut tables = vec![DataTable::load(source)?];
        while source.next_result()? {
            tables.push(DataTable::load(source)?);
        }
        Ok(Self { tables })
    }

    pub async fn load_async(source: &mut dyn RowSource) -> Result<Self> {
        let mut tables = vec![DataTable::load_async(source).await?];
        while source.next_result_async().await? {
            tables.push(DataTable::load_async(source).await?);
        }
        Ok(Self { tables })
    }

    #[must_use]
    pub fn table(&self, index: usize) -> Option<&DataTable> {
        self.tables.get(index)
    }
}

/// In-memory row source over one or more result sets
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    sets: Vec<DataTable>,
    set: usize,
    row: Option<usize>,
}

impl MemoryRowSource {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::from_table(DataTable::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        ))
    }

    #[must_use]
    pub fn from_table(table: DataTable) -> Self {
        Self::from_dataset(DataSet { tables: vec![table] })
    }

    #[must_use]
    pub fn from_dataset(dataset: DataSet) -> Self {
        Self {
            sets: dataset.tables,
            set: 0,
            row: None,
        }
    }

    /// Append another result set
    #[must_use]
    pub fn with_result(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.sets.push(DataTable::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        ));
        self
    }

    fn current(&self) -> Option<&DataTable> {
        self.sets.get(self.set)
    }
}

impl RowSource for MemoryRowSource {
    fn field_count(&self) -> usize {
        self.current().map_or(0, |t| t.columns.len())
    }

    fn column_name(&self, index: usize) -> &str {
        self.current()
            .and_then(|t| t.columns.get(index))
            .map_or("", String::as_str)
    }

    fn read(&mut self) -> Result<bool> {
        let Some(table) = self.sets.get(self.set) else {
            return Ok(false);
        };
        let next = self.row.map_or(0, |r| r + 1);
        if next < table.rows.len() {
            self.row = Some(next);
            Ok(true)
        } else {
            self.row = Some(table.rows.len());
            Ok(false)
        }
    }

    fn value(&self, index: usize) -> Option<&Value> {
        self.current()?.rows.get(self.row?)?.get(index)
    }

    fn next_result(&mut self) -> Result<bool> {
        if self.set < self.sets.len() {
            self.set += 1;
        }
        self.row = None;
        Ok(self.set < self.sets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemoryRowSource {
        MemoryRowSource::new(
            &["id", "Name"],
            vec![
                vec![Value::Integer(1), Value::Text("a".into())],
                vec![Value::Integer(2), Value::Null],
            ],
        )
        .with_result(&["total"], vec![vec![Value::Integer(9)]])
    }

    #[test]
    fn test_forward_only_reads() {
        let mut source = source();
        assert_eq!(source.value(0), None);
        assert!(source.read().unwrap());
        assert_eq!(source.value(0), Some(&Value::Integer(1)));
        assert!(source.read().unwrap());
        assert_eq!(source.value(1), Some(&Value::Null));
        assert!(!source.read().unwrap());
        assert!(!source.read().unwrap());

        assert!(source.next_result().unwrap());
        assert_eq!(source.columns(), vec!["total"]);
        assert!(source.read().unwrap());
        assert_eq!(source.value(0), Some(&Value::Integer(9)));
        assert!(!source.next_result().unwrap());
        assert!(!source.next_result().unwrap());
        assert!(!source.read().unwrap());
    }

    #[test]
    fn test_ordinal_lookup() {
        let source = source();
        assert_eq!(source.ordinal("Name"), Some(1));
        assert_eq!(source.ordinal("name"), Some(1));
        assert_eq!(source.ordinal("missing"), None);
    }

    #[test]
    fn test_dataset_load() {
        let mut source = source();
        let dataset = DataSet::load(&mut source).unwrap();
        assert_eq!(dataset.tables.len(), 2);
        assert_eq!(dataset.tables[0].len(), 2);
        assert_eq!(dataset.tables[0].get(0, "name"), Some(&Value::Text("a".into())));
        assert_eq!(dataset.table(1).unwrap().get(0, "TOTAL"), Some(&Value::Integer(9)));
    }

    #[test]
    fn test_render_table() {
        let mut source = source();
        let table = DataTable::load(&mut source).unwrap();
        let rendered = table.render();
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("NULL"));
    }

    #[tokio::test]
    async fn test_async_load() {
        let mut source = source();
        let dataset = DataSet::load_async(&mut source).await.unwrap();
        assert_eq!(dataset.tables[1].rows, vec![vec![Value::Integer(9)]]);
    }
}
