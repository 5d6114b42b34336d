use crate::error::ZarpError;
use crate::schema::ColumnMapping;
use crate::value::Value;

/// Rectangular table of [`Value`]s with ordered, named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self, ZarpError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), ZarpError> {
        if row.len() != self.columns.len() {
            return Err(ZarpError::TableParse(format!(
                "row {} has {} fields, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    pub fn set(&mut self, row: usize, column: &str, value: Value) -> Result<(), ZarpError> {
        let index = self
            .column_index(column)
            .ok_or_else(|| ZarpError::MissingColumn(column.to_string()))?;
        let actual = self.rows.len();
        let cells = self.rows.get_mut(row).ok_or(ZarpError::LengthMismatch {
            expected: row + 1,
            actual,
        })?;
        cells[index] = value;
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Adds a column filled with `fill`; existing columns are left untouched.
    pub fn add_column(&mut self, name: &str, fill: Value) {
        if self.has_column(name) {
            return;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    pub fn rename(&mut self, mapping: &ColumnMapping) {
        for column in &mut self.columns {
            if let Some(target) = mapping.get(column) {
                *column = target.to_string();
            }
        }
    }

    /// Keeps only `names`, in the given order; fails on unknown columns.
    pub fn select(&self, names: &[&str]) -> Result<Table, ZarpError> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| ZarpError::MissingColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.project(names, &indices))
    }

    /// Keeps only `names`, in the given order; unknown columns are created
    /// and filled with `fill`.
    pub fn select_or_fill(&self, names: &[&str], fill: &Value) -> Table {
        let mut table = self.clone();
        for name in names {
            table.add_column(name, fill.clone());
        }
        let indices = names
            .iter()
            .filter_map(|name| table.column_index(name))
            .collect::<Vec<_>>();
        table.project(names, &indices)
    }

    /// Keeps rows for which `keep` returns true.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize, &[Value]) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(index, row)| keep(*index, row))
                .map(|(_, row)| row.clone())
                .collect(),
        }
    }

    fn project(&self, names: &[&str], indices: &[usize]) -> Table {
        Table {
            columns: names.iter().map(|name| name.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&index| row[index].clone()).collect())
                .collect(),
        }
    }

    /// Plain-text rendering for log output.
    pub fn render(&self) -> String {
        let mut out = self.columns.join("\t");
        for row in &self.rows {
            out.push('\n');
            let cells = row.iter().map(ToString::to_string).collect::<Vec<_>>();
            out.push_str(&cells.join("\t"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_rows(
            ["sample", "fq1"],
            vec![
                vec![Value::from("a"), Value::from("a.fq")],
                vec![Value::from("b"), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn push_row_checks_width() {
        let mut table = table();
        assert!(table.push_row(vec![Value::Null]).is_err());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn select_or_fill_creates_missing_columns() {
        let selected = table().select_or_fill(&["fq1", "fq2", "sample"], &Value::from(""));
        assert_eq!(selected.columns(), ["fq1", "fq2", "sample"]);
        assert_eq!(selected.get(0, "fq2"), Some(&Value::from("")));
        assert_eq!(selected.get(1, "sample"), Some(&Value::from("b")));
    }

    #[test]
    fn rename_uses_mapping() {
        let mut table = table();
        table.rename(&ColumnMapping::zarp_to_model());
        assert_eq!(table.columns(), ["name", "paths_1"]);
    }

    #[test]
    fn render_marks_nulls() {
        assert_eq!(table().render(), "sample\tfq1\na\ta.fq\nb\tNA");
    }
}
