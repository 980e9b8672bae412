// Cleaning stage: keep completed orders, project the retained columns, and
// derive the prepaid surcharge columns.
use std::path::Path;

use tracing::{debug, info};

use crate::config::{
    FeeSchedule, FilterConfig, PipelineConfig, PREPAID_COLUMN, PREPAID_TOTAL_COLUMN,
};
use crate::error::PipelineResult;
use crate::loader::{load_table, parse_error, validate_rows};
use crate::output::write_table;
use crate::types::{CleanStats, FieldKind, Table};
use crate::util::{
    format_date, format_fee, format_float, format_int, parse_currency, parse_date, parse_numeric,
};

/// Zero-based input positions of the rows whose filter column equals the
/// configured value exactly.
pub fn matching_rows(table: &Table, filter: &FilterConfig) -> PipelineResult<Vec<usize>> {
    let idx = table.require_column(&filter.column, "row filter")?;
    Ok(table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row[idx] == filter.value)
        .map(|(i, _)| i)
        .collect())
}

fn select_rows(table: &Table, positions: &[usize]) -> Table {
    Table {
        headers: table.headers.clone(),
        rows: positions.iter().map(|&i| table.rows[i].clone()).collect(),
    }
}

/// Keep the rows whose filter column equals the configured value exactly.
pub fn filter_rows(table: &Table, filter: &FilterConfig) -> PipelineResult<Table> {
    let positions = matching_rows(table, filter)?;
    Ok(select_rows(table, &positions))
}

/// Restrict `table` to `columns`, in that order.
pub fn project_columns(table: &Table, columns: &[&str]) -> PipelineResult<Table> {
    let indices = columns
        .iter()
        .map(|name| table.require_column(name, "column projection"))
        .collect::<PipelineResult<Vec<usize>>>()?;
    let rows = table
        .rows
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Ok(Table {
        headers: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    })
}

/// Prepaid surcharge for one order line.
///
/// Winterization covers the included zones for the base fee and charges the
/// per-zone fee beyond that; backflow is flat; anything else is free.
pub fn prepaid_fee(service: &str, quantity: f64, fees: &FeeSchedule) -> f64 {
    if service == fees.winterization_service {
        if quantity <= fees.winterization_included_zones {
            fees.winterization_base_fee
        } else {
            fees.winterization_base_fee
                + (quantity - fees.winterization_included_zones) * fees.winterization_per_zone_fee
        }
    } else if service == fees.backflow_service {
        fees.backflow_fee
    } else {
        0.0
    }
}

/// Run the whole cleaning transform in memory.
pub fn clean_table(table: &Table, config: &PipelineConfig) -> PipelineResult<(Table, CleanStats)> {
    let rows_read = table.len();
    // Input row of every kept row, so errors point at the source line.
    let source_rows = matching_rows(table, &config.filter)?;
    let filtered = select_rows(table, &source_rows);
    info!(
        rows_read,
        rows_kept = filtered.len(),
        column = %config.filter.column,
        value = %config.filter.value,
        "filtered rows"
    );

    let projected = project_columns(&filtered, &config.column_names())?;
    validate_rows(&projected, &config.columns, |i| source_rows[i])?;

    let fees = &config.fees;
    let service_idx = projected.require_column(&fees.service_column, "prepaid fee")?;
    let quantity_idx = projected.require_column(&fees.quantity_column, "prepaid fee")?;
    let total_idx = projected.require_column(&fees.total_column, "prepaid fee")?;

    // For each output column: where its value comes from.
    enum Source {
        Prepaid,
        PrepaidTotal,
        Total,
        Date(usize),
        Raw(usize),
    }
    let sources = config
        .output_columns
        .iter()
        .map(|name| -> PipelineResult<Source> {
            Ok(match name.as_str() {
                PREPAID_COLUMN => Source::Prepaid,
                PREPAID_TOTAL_COLUMN => Source::PrepaidTotal,
                n if n == fees.total_column => Source::Total,
                n => {
                    let idx = projected.require_column(n, "output schema")?;
                    match config.columns[idx].kind {
                        FieldKind::Date => Source::Date(idx),
                        _ => Source::Raw(idx),
                    }
                }
            })
        })
        .collect::<PipelineResult<Vec<Source>>>()?;

    let mut out = Table::new(config.output_columns.clone());
    let mut prepaid_rows = 0usize;
    let mut prepaid_total = 0.0f64;

    for (row, &row_idx) in projected.rows.iter().zip(&source_rows) {
        let quantity = parse_numeric(&row[quantity_idx]).ok_or_else(|| {
            parse_error(row_idx, &fees.quantity_column, &row[quantity_idx], FieldKind::Numeric)
        })?;
        let total = parse_currency(&row[total_idx]).ok_or_else(|| {
            parse_error(row_idx, &fees.total_column, &row[total_idx], FieldKind::Currency)
        })?;
        let prepaid = prepaid_fee(&row[service_idx], quantity, fees);
        if prepaid != 0.0 {
            prepaid_rows += 1;
            prepaid_total += prepaid;
        }

        let mut cells = Vec::with_capacity(sources.len());
        for source in &sources {
            let cell = match source {
                Source::Prepaid => format_fee(prepaid),
                Source::PrepaidTotal => format_float(prepaid + total),
                Source::Total => format_float(total),
                Source::Date(i) => {
                    let raw = &row[*i];
                    if raw.trim().is_empty() {
                        String::new()
                    } else {
                        let date = parse_date(raw).ok_or_else(|| {
                            parse_error(row_idx, &projected.headers[*i], raw, FieldKind::Date)
                        })?;
                        format_date(date, &config.date_output_format)
                    }
                }
                Source::Raw(i) => row[*i].clone(),
            };
            cells.push(cell);
        }
        debug!(row = row_idx + 1, prepaid, total, "derived prepaid columns");
        out.rows.push(cells);
    }

    let stats = CleanStats {
        rows_read,
        rows_kept: out.len(),
        prepaid_rows,
        prepaid_total,
    };
    Ok((out, stats))
}

/// Load `input`, clean it, and write the result to `output`.
pub fn run_clean(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> PipelineResult<CleanStats> {
    let table = load_table(input)?;
    let (cleaned, stats) = clean_table(&table, config)?;
    write_table(output, &cleaned)?;
    info!(
        prepaid_rows = stats.prepaid_rows,
        "cleaning finished: kept {} of {} rows",
        format_int(stats.rows_kept),
        format_int(stats.rows_read)
    );
    Ok(stats)
}
