use crate::types::AnalysisError;
use serde::Serialize;
use std::fmt::Write as _;
use tabled::{settings::Style, Table, Tabled};

/// Render a table for the plain-text report file.
pub fn render_table<T>(rows: &[T]) -> String
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows.to_vec()).with(Style::ascii()).to_string()
}

/// Write the flat text report: labeled sections, one rendered table each.
pub fn write_report(path: &str, sections: &[(String, String)]) -> Result<(), AnalysisError> {
    let mut body = String::new();
    for (i, (title, table)) in sections.iter().enumerate() {
        let _ = writeln!(body, "=== Section {}: {} ===", i + 1, title);
        let _ = writeln!(body, "{}", table);
        let _ = writeln!(body);
    }
    std::fs::write(path, body)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), AnalysisError> {
    let s = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown preview of the first `max_rows` rows on the console.
pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GiniRow;

    #[test]
    fn report_sections_are_labeled_in_order() {
        let dir = std::env::temp_dir().join("poverty_report_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.txt");
        let sections = vec![
            ("Summary Statistics".to_string(), "(no rows)".to_string()),
            ("Top 10 Countries by MPI".to_string(), "(no rows)".to_string()),
        ];
        write_report(path.to_str().unwrap(), &sections).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("=== Section 1: Summary Statistics ==="));
        assert!(body.contains("=== Section 2: Top 10 Countries by MPI ==="));
    }

    #[test]
    fn unwritable_path_is_a_write_error() {
        let sections = vec![("Summary".to_string(), "x".to_string())];
        let err = write_report("no_such_dir/report.txt", &sections).unwrap_err();
        assert!(matches!(err, AnalysisError::Write(_)));
    }

    #[test]
    fn render_table_handles_empty_input() {
        let rows: Vec<GiniRow> = Vec::new();
        assert_eq!(render_table(&rows), "(no rows)");
    }
}
