use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn add_count(&mut self, label: &str, count: usize) {
        self.add_row(label, &count.to_string());
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Two-column table of label/count pairs, in the given order
pub fn counts_table<'a>(rows: impl IntoIterator<Item = (&'a str, usize)>) -> String {
    let mut builder = TableBuilder::new();
    for (label, count) in rows {
        builder.add_count(label, count);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        assert_eq!(TableBuilder::new().build(), "");
    }

    #[test]
    fn test_counts_table() {
        let table = counts_table([("units", 3), ("groups", 12)]);
        assert!(table.contains("Metric"));
        assert!(table.contains("units"));
        assert!(table.contains("12"));
        assert!(table.find("units").unwrap() < table.find("groups").unwrap());
    }
}
