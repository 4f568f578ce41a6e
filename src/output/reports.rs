//! Plain-text tables for command replies

use prettytable::{format, Cell, Row, Table};
use serde_json::Value;

/// Format a compact table with headers and rows using prettytable-rs clean format
pub fn format_compact_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);

    let header_cells: Vec<Cell> = headers.iter().map(|header| Cell::new(header)).collect();
    table.add_row(Row::new(header_cells));

    for row in rows {
        let data_cells: Vec<Cell> = row.iter().map(|cell| Cell::new(cell)).collect();
        table.add_row(Row::new(data_cells));
    }

    // Two-space indent, no trailing blanks, no final newline
    table
        .to_string()
        .lines()
        .map(|line| format!("  {}", line.trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a JSON value for a reply: strings bare, everything else as JSON
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `key = value` lines, one per entry
pub fn format_key_values<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    entries
        .into_iter()
        .map(|(key, value)| format!("  {} = {}", key, format_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_compact_table() {
        assert_eq!(format_compact_table(&["A"], &[]), "");

        let table = format_compact_table(
            &["Name", "State"],
            &[vec!["ping".to_string(), "enabled".to_string()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  "));
        assert!(lines[0].trim_start().starts_with("Name"));
        assert!(lines[1].contains("ping"));
        assert!(lines[1].ends_with("enabled"));
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_value(&json!("text")), "text");
        assert_eq!(format_value(&json!(5)), "5");
        assert_eq!(format_value(&json!([1, "a"])), "[1,\"a\"]");

        let mut map = BTreeMap::new();
        map.insert("b".to_string(), json!(2));
        map.insert("a".to_string(), json!("x"));
        assert_eq!(format_key_values(&map), "  a = x\n  b = 2");
    }
}
