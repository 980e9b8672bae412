use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table as TextTable, Tabled};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::types::Table;

/// Write `table` as CSV (header row first, quoting only where needed).
///
/// Rows go to a sibling `.tmp` file that replaces `path` only once fully
/// flushed, so a failed run never leaves a truncated report behind.
pub fn write_table(path: impl AsRef<Path>, table: &Table) -> PipelineResult<()> {
    let path = path.as_ref();
    let tmp = temp_path_for(path);
    let result = fs::File::create(&tmp)
        .map_err(|e| PipelineError::io(&tmp, e))
        .and_then(|file| write_table_to(file, table, &tmp))
        .and_then(|_| fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e)));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;
    info!(path = ?path, rows = table.len(), "table written");
    Ok(())
}

/// Serialize `table` into any writer. `label` names the sink in errors.
pub fn write_table_to<W: Write>(writer: W, table: &Table, label: &Path) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.headers)
        .map_err(|e| PipelineError::csv(label, e))?;
    for row in &table.rows {
        wtr.write_record(row)
            .map_err(|e| PipelineError::csv(label, e))?;
    }
    wtr.flush().map_err(|e| PipelineError::io(label, e))?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> PipelineResult<()> {
    let path = path.as_ref();
    let s = serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::Config(format!("cannot serialize stats: {e}")))?;
    fs::write(path, s).map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

/// Markdown rendering of the first `max_rows` rows of `table`.
pub fn render_preview(table: &Table, max_rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.headers.iter().cloned());
    for row in table.rows.iter().take(max_rows) {
        builder.push_record(row.iter().cloned());
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_table(table: &Table, max_rows: usize) {
    if table.is_empty() || max_rows == 0 {
        println!("(no rows)\n");
        return;
    }
    println!("{}\n", render_preview(table, max_rows));
}

pub fn print_stats<T: Tabled>(stats: T) {
    let table_str = TextTable::new([stats]).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table {
            headers: vec!["Name".into(), "Total".into()],
            rows: vec![
                vec!["Smith, Jo".into(), "10.0".into()],
                vec![String::new(), String::new()],
            ],
        }
    }

    #[test]
    fn quotes_only_cells_that_need_it() {
        let mut buf = Vec::new();
        write_table_to(&mut buf, &sample(), Path::new("mem")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Name,Total\n\"Smith, Jo\",10.0\n,\n");
    }

    #[test]
    fn preview_is_markdown_and_truncated() {
        let rendered = render_preview(&sample(), 1);
        assert!(rendered.contains("| Name"));
        assert!(rendered.contains("Smith, Jo"));
        assert_eq!(rendered.lines().count(), 3);
    }

    #[test]
    fn temp_path_is_a_sibling() {
        assert_eq!(
            temp_path_for(Path::new("out/report.csv")),
            PathBuf::from("out/report.csv.tmp")
        );
    }
}
