// Subtotal report: order the cleaned rows by day and agent crew, then follow
// every crew's rows with a subtotal row and a blank spacer row.
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::{PipelineConfig, SummaryConfig};
use crate::error::PipelineResult;
use crate::loader::{load_table, parse_error};
use crate::output::write_table;
use crate::types::{FieldKind, Record, SummaryStats, Table};
use crate::util::{
    format_date, format_float, format_int, parse_currency, parse_date, round_half_even,
};

/// Composite grouping key. A blank additional-agents cell is the empty string
/// and therefore sorts before any named crew member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupKey {
    pub date: NaiveDate,
    pub agent: String,
    pub additional_agents: String,
}

/// An ordinary report row with its parsed key and amount.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: GroupKey,
    pub amount: f64,
    /// Output cells: the raw input with date and amount normalized.
    pub record: Record,
}

/// A maximal run of sorted entries sharing one key.
#[derive(Debug)]
pub struct Group<'a> {
    pub key: &'a GroupKey,
    pub entries: &'a [Entry],
}

impl Group<'_> {
    pub fn total(&self, decimals: u32) -> f64 {
        let sum: f64 = self.entries.iter().map(|e| e.amount).sum();
        round_half_even(sum, decimals)
    }
}

struct Columns {
    date: usize,
    agent: usize,
    additional: usize,
    amount: usize,
}

fn resolve_columns(table: &Table, cfg: &SummaryConfig) -> PipelineResult<Columns> {
    Ok(Columns {
        date: table.require_column(&cfg.date_column, "summary grouping")?,
        agent: table.require_column(&cfg.agent_column, "summary grouping")?,
        additional: table.require_column(&cfg.additional_agents_column, "summary grouping")?,
        amount: table.require_column(&cfg.amount_column, "summary amount")?,
    })
}

/// Parse the date and amount of every row. Any unparseable cell aborts.
pub fn parse_entries(table: &Table, config: &PipelineConfig) -> PipelineResult<Vec<Entry>> {
    let cfg = &config.summary;
    let cols = resolve_columns(table, cfg)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| -> PipelineResult<Entry> {
            let raw_date = &row[cols.date];
            let date = parse_date(raw_date)
                .ok_or_else(|| parse_error(row_idx, &cfg.date_column, raw_date, FieldKind::Date))?;
            let raw_amount = &row[cols.amount];
            let amount = parse_currency(raw_amount).ok_or_else(|| {
                parse_error(row_idx, &cfg.amount_column, raw_amount, FieldKind::Currency)
            })?;

            let mut record = row.clone();
            record[cols.date] = format_date(date, &config.date_output_format);
            record[cols.amount] = format_float(amount);
            Ok(Entry {
                key: GroupKey {
                    date,
                    agent: row[cols.agent].clone(),
                    additional_agents: row[cols.additional].clone(),
                },
                amount,
                record,
            })
        })
        .collect()
}

/// Stable sort by (date, agent, additional agents); ties keep input order.
pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| a.key.cmp(&b.key));
}

/// Split sorted entries into runs of equal keys.
pub fn group_entries(entries: &[Entry]) -> Vec<Group<'_>> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=entries.len() {
        if i == entries.len() || entries[i].key != entries[start].key {
            groups.push(Group {
                key: &entries[start].key,
                entries: &entries[start..i],
            });
            start = i;
        }
    }
    groups
}

/// Subtotal row: blank except for the rounded amount.
pub fn summary_record(table: &Table, amount_idx: usize, total: f64) -> Record {
    let mut record = table.blank_record();
    record[amount_idx] = format_float(total);
    record
}

pub fn spacer_record(table: &Table) -> Record {
    table.blank_record()
}

/// Build the subtotal report in memory.
pub fn summarize_table(
    table: &Table,
    config: &PipelineConfig,
) -> PipelineResult<(Table, SummaryStats)> {
    let amount_idx = table.require_column(&config.summary.amount_column, "summary amount")?;
    let mut entries = parse_entries(table, config)?;
    sort_entries(&mut entries);
    let groups = group_entries(&entries);

    let mut out = Table::new(table.headers.clone());
    let mut grand_total = 0.0;
    for group in &groups {
        let total = group.total(config.summary.decimals);
        debug!(
            date = %group.key.date,
            agent = %group.key.agent,
            additional_agents = %group.key.additional_agents,
            rows = group.entries.len(),
            total,
            "group summarized"
        );
        out.rows.extend(group.entries.iter().map(|e| e.record.clone()));
        out.rows.push(summary_record(table, amount_idx, total));
        out.rows.push(spacer_record(table));
        grand_total += total;
    }

    let stats = SummaryStats {
        rows_read: entries.len(),
        groups: groups.len(),
        grand_total: round_half_even(grand_total, config.summary.decimals),
    };
    info!(rows = stats.rows_read, groups = stats.groups, "summary built");
    Ok((out, stats))
}

/// Load `input`, build the subtotal report, and write it to `output`.
pub fn run_process(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> PipelineResult<SummaryStats> {
    let table = load_table(input)?;
    let (report, stats) = summarize_table(&table, config)?;
    write_table(output, &report)?;
    info!(
        "summary finished: {} rows in {} groups",
        format_int(stats.rows_read),
        format_int(stats.groups)
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::loader::load_table_from_reader;

    const HEADER: &str = "Id,Date,Service Agent,Additional Agents,Total,Prepaid,Prepaid+Total";

    fn table(rows: &[&str]) -> Table {
        let mut csv = String::from(HEADER);
        for r in rows {
            csv.push('\n');
            csv.push_str(r);
        }
        csv.push('\n');
        load_table_from_reader(csv.as_bytes(), "inline").unwrap()
    }

    fn is_blank(r: &Record) -> bool {
        r.iter().all(|c| c.is_empty())
    }

    #[test]
    fn two_rows_same_group() {
        let t = table(&[
            "1,03/05/24,Jane,,100.0,126,226.0",
            "2,03/05/24,Jane,,50.0,0,50.0",
        ]);
        let (out, stats) = summarize_table(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out.rows.len(), 4);
        assert_eq!(out.rows[0][0], "1");
        assert_eq!(out.rows[1][0], "2");
        assert_eq!(out.rows[2], vec!["", "", "", "", "", "", "276.0"]);
        assert!(is_blank(&out.rows[3]));
        assert_eq!(stats.groups, 1);
        assert_eq!(stats.grand_total, 276.0);
    }

    #[test]
    fn orders_groups_by_date_agent_and_crew() {
        let t = table(&[
            "1,03/06/24,Adam,,1,0,1",
            "2,03/05/24,Zed,,2,0,2",
            "3,03/05/24,Adam,Bob,3,0,3",
            "4,03/05/24,Adam,,4,0,4",
            "5,03/05/24,Adam,Bob,5,0,5",
        ]);
        let (out, stats) = summarize_table(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(stats.groups, 4);
        let ids: Vec<&str> = out.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(
            ids,
            vec!["4", "", "", "3", "5", "", "", "2", "", "", "1", "", ""]
        );
        // Subtotal of the Adam+Bob crew.
        assert_eq!(out.rows[5][6], "8.0");
    }

    #[test]
    fn sort_is_stable_within_a_group() {
        let t = table(&[
            "b,03/05/24,Jane,,1,0,1",
            "a,03/05/24,Jane,,1,0,1",
            "c,03/05/24,Jane,,1,0,1",
        ]);
        let mut entries = parse_entries(&t, &PipelineConfig::default()).unwrap();
        sort_entries(&mut entries);
        let ids: Vec<&str> = entries.iter().map(|e| e.record[0].as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn groups_partition_every_row_once() {
        let t = table(&[
            "1,03/05/24,Jane,,1,0,1",
            "2,03/05/24,Jane,Al,1,0,1",
            "3,2024-03-05,Jane,,1,0,1",
            "4,03/07/24,Jane,,1,0,1",
        ]);
        let mut entries = parse_entries(&t, &PipelineConfig::default()).unwrap();
        sort_entries(&mut entries);
        let groups = group_entries(&entries);
        assert_eq!(groups.len(), 3);
        let sizes: Vec<usize> = groups.iter().map(|g| g.entries.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
        assert_eq!(sizes.iter().sum::<usize>(), t.rows.len());
        for g in &groups {
            assert!(g.entries.iter().all(|e| &e.key == g.key));
        }
    }

    #[test]
    fn normalizes_dates_and_amounts_on_ordinary_rows() {
        let t = table(&["1,2024-03-05,Jane,,1,0,\"$1,226.00\""]);
        let (out, _) = summarize_table(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out.rows[0][1], "03/05/24");
        assert_eq!(out.rows[0][6], "1226.0");
        assert_eq!(out.rows[1][6], "1226.0");
    }

    #[test]
    fn group_sum_is_rounded_to_cents() {
        let t = table(&[
            "1,03/05/24,Jane,,0,0,0.1",
            "2,03/05/24,Jane,,0,0,0.2",
        ]);
        let (out, _) = summarize_table(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(out.rows[2][6], "0.3");
    }

    #[test]
    fn empty_input_yields_header_only() {
        let t = table(&[]);
        let (out, stats) = summarize_table(&t, &PipelineConfig::default()).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.headers, t.headers);
        assert_eq!(stats.groups, 0);
    }

    #[test]
    fn unparseable_amount_aborts() {
        let t = table(&["1,03/05/24,Jane,,0,0,lots"]);
        let err = summarize_table(&t, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { row: 1, .. }));
    }

    #[test]
    fn missing_group_column_is_schema_error() {
        let t = load_table_from_reader("Date,Prepaid+Total\n03/05/24,1\n".as_bytes(), "inline")
            .unwrap();
        let err = summarize_table(&t, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }
}
