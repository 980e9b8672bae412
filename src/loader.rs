use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::config::FieldSpec;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{FieldKind, Table};
use crate::util::{parse_currency, parse_date, parse_numeric};

/// Read a CSV file with a header row, keeping every cell as raw text.
pub fn load_table(path: impl AsRef<Path>) -> PipelineResult<Table> {
    let path = path.as_ref();
    let rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;
    read_table(rdr, path)
}

/// Same as `load_table`, for any reader. `label` names the source in errors.
pub fn load_table_from_reader<R: Read>(reader: R, label: &str) -> PipelineResult<Table> {
    let rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    read_table(rdr, Path::new(label))
}

fn read_table<R: Read>(mut rdr: csv::Reader<R>, path: &Path) -> PipelineResult<Table> {
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let width = headers.len();
    let mut table = Table::new(headers);

    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| PipelineError::csv(path, e))?;
        let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if row.len() > width {
            warn!(
                row = idx + 1,
                cells = row.len(),
                width,
                "dropping cells beyond the header width"
            );
        }
        // Short rows are padded, matching how blank trailing cells read.
        row.resize(width, String::new());
        table.rows.push(row);
    }
    debug!(rows = table.len(), columns = width, path = ?path, "table loaded");
    Ok(table)
}

/// Check every typed column of `table` against its spec.
///
/// A missing column is a schema error. Blank cells pass unless the field is
/// `required`; non-blank cells must parse as the tagged kind.
pub fn validate_columns(table: &Table, specs: &[FieldSpec]) -> PipelineResult<()> {
    validate_rows(table, specs, |i| i)
}

/// `validate_columns` for a table derived from another one: `source_row`
/// maps a row position in `table` to the zero-based row it came from, and
/// errors report that original row.
pub fn validate_rows<F>(table: &Table, specs: &[FieldSpec], source_row: F) -> PipelineResult<()>
where
    F: Fn(usize) -> usize,
{
    for spec in specs {
        let idx = table.require_column(&spec.name, "typed column")?;
        for (pos, row) in table.rows.iter().enumerate() {
            let row_no = source_row(pos);
            let cell = row[idx].as_str();
            if cell.trim().is_empty() {
                if spec.required {
                    return Err(parse_error(row_no, &spec.name, cell, spec.kind));
                }
                continue;
            }
            let ok = match spec.kind {
                FieldKind::Text => true,
                FieldKind::Date => parse_date(cell).is_some(),
                FieldKind::Currency => parse_currency(cell).is_some(),
                FieldKind::Numeric => parse_numeric(cell).is_some(),
            };
            if !ok {
                return Err(parse_error(row_no, &spec.name, cell, spec.kind));
            }
        }
    }
    Ok(())
}

/// Build a parse error for the zero-based data row `row_idx`.
pub fn parse_error(row_idx: usize, column: &str, value: &str, kind: FieldKind) -> PipelineError {
    PipelineError::Parse {
        row: row_idx + 1,
        column: column.to_string(),
        value: value.to_string(),
        expected: kind.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, kind: FieldKind, required: bool) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            kind,
            required,
        }
    }

    #[test]
    fn reads_headers_and_pads_short_rows() {
        let csv = "Id,Date,Total\n1,03/05/24,$10.00\n2,03/06/24\n";
        let table = load_table_from_reader(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.headers, vec!["Id", "Date", "Total"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["2", "03/06/24", ""]);
    }

    #[test]
    fn keeps_quoted_cells_raw() {
        let csv = "Name,Total\n\"Smith, Jo\",\"$1,200.00\"\n";
        let table = load_table_from_reader(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.rows[0], vec!["Smith, Jo", "$1,200.00"]);
    }

    #[test]
    fn validation_reports_row_and_column() {
        let csv = "Date,Total\n03/05/24,$10\n03/06/24,ten dollars\n";
        let table = load_table_from_reader(csv.as_bytes(), "inline").unwrap();
        let err = validate_columns(
            &table,
            &[
                spec("Date", FieldKind::Date, true),
                spec("Total", FieldKind::Currency, true),
            ],
        )
        .unwrap_err();
        match err {
            PipelineError::Parse { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Total");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_maps_rows_back_to_their_source() {
        let csv = "Total\n$1\nnope\n";
        let table = load_table_from_reader(csv.as_bytes(), "inline").unwrap();
        let err = validate_rows(
            &table,
            &[spec("Total", FieldKind::Currency, true)],
            |i| [4, 9][i],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Parse { row: 10, .. }));
    }

    #[test]
    fn blank_cells_only_fail_when_required() {
        let csv = "Date,Discount\n03/05/24,\n";
        let table = load_table_from_reader(csv.as_bytes(), "inline").unwrap();
        validate_columns(&table, &[spec("Discount", FieldKind::Currency, false)]).unwrap();
        assert!(
            validate_columns(&table, &[spec("Discount", FieldKind::Currency, true)]).is_err()
        );
    }

    #[test]
    fn missing_column_is_schema_error() {
        let table = load_table_from_reader("Date\n03/05/24\n".as_bytes(), "inline").unwrap();
        let err = validate_columns(&table, &[spec("Total", FieldKind::Currency, true)]);
        assert!(matches!(err, Err(PipelineError::Schema { .. })));
    }
}
