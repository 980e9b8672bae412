use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::FieldKind;

pub const PREPAID_COLUMN: &str = "Prepaid";
pub const PREPAID_TOTAL_COLUMN: &str = "Prepaid+Total";

/// Row predicate applied before projection.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterConfig {
    pub column: String,
    pub value: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            column: "Status".to_string(),
            value: "Completed".to_string(),
        }
    }
}

/// A retained column together with its type tag.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Blank cells are rejected when set.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    fn new(name: &str, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required,
        }
    }
}

/// Column names the fee calculation reads from and writes to.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeeSchedule {
    pub service_column: String,
    pub quantity_column: String,
    pub total_column: String,
    pub winterization_service: String,
    pub winterization_base_fee: f64,
    pub winterization_per_zone_fee: f64,
    /// Zones covered by the base fee.
    pub winterization_included_zones: f64,
    pub backflow_service: String,
    pub backflow_fee: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            service_column: "Service/Part Name".to_string(),
            quantity_column: "Quantity".to_string(),
            total_column: "Total".to_string(),
            winterization_service: "Pre-Paid Winterization".to_string(),
            winterization_base_fee: 110.0,
            winterization_per_zone_fee: 8.0,
            winterization_included_zones: 10.0,
            backflow_service: "Prepaid Backflow".to_string(),
            backflow_fee: 75.0,
        }
    }
}

/// Grouping and aggregation settings for the subtotal report.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SummaryConfig {
    pub date_column: String,
    pub agent_column: String,
    pub additional_agents_column: String,
    pub amount_column: String,
    pub decimals: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            agent_column: "Service Agent".to_string(),
            additional_agents_column: "Additional Agents".to_string(),
            amount_column: PREPAID_TOTAL_COLUMN.to_string(),
            decimals: 2,
        }
    }
}

/// Every tunable of both stages. `Default` reproduces the stock report.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub columns: Vec<FieldSpec>,
    /// Ordered output schema of the cleaning stage: every retained column
    /// plus the two derived fee columns, each exactly once.
    pub output_columns: Vec<String>,
    pub fees: FeeSchedule,
    pub summary: SummaryConfig,
    pub date_output_format: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        use FieldKind::*;
        let columns = vec![
            FieldSpec::new("Id", Text, false),
            FieldSpec::new("Date", Date, true),
            FieldSpec::new("Contact Name", Text, false),
            FieldSpec::new("Service Address", Text, false),
            FieldSpec::new("Service Agent", Text, false),
            FieldSpec::new("Additional Agents", Text, false),
            FieldSpec::new("Number of Agents", Numeric, false),
            FieldSpec::new("Quantity", Numeric, true),
            FieldSpec::new("Service/Part Name", Text, false),
            FieldSpec::new("Total", Currency, true),
            FieldSpec::new("Discount", Currency, false),
            FieldSpec::new("SES Score", Numeric, false),
        ];
        let output_columns = [
            "Id",
            "Date",
            "Contact Name",
            "Service Address",
            "Service Agent",
            "Additional Agents",
            "Number of Agents",
            "Quantity",
            "Service/Part Name",
            "Total",
            "Discount",
            PREPAID_COLUMN,
            PREPAID_TOTAL_COLUMN,
            "SES Score",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Self {
            filter: FilterConfig::default(),
            columns,
            output_columns,
            fees: FeeSchedule::default(),
            summary: SummaryConfig::default(),
            date_output_format: "%m/%d/%y".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> PipelineResult<Self> {
        let cfg: PipelineConfig =
            toml::from_str(s).map_err(|e| PipelineError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_toml_str(&s)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        match path {
            Some(p) => Self::from_toml_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The output schema must name each retained and derived column once and
    /// nothing else; the fee and summary columns must be retained.
    pub fn validate(&self) -> PipelineResult<()> {
        let mut expected: HashSet<&str> = self.column_names().into_iter().collect();
        if expected.len() != self.columns.len() {
            return Err(PipelineError::Config(
                "duplicate name in `columns`".to_string(),
            ));
        }
        for derived in [PREPAID_COLUMN, PREPAID_TOTAL_COLUMN] {
            if !expected.insert(derived) {
                return Err(PipelineError::Config(format!(
                    "`{derived}` is derived and cannot be a retained column"
                )));
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for name in &self.output_columns {
            if !expected.contains(name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "output column `{name}` is neither retained nor derived"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "output column `{name}` listed twice"
                )));
            }
        }
        if let Some(missing) = expected.iter().find(|n| !seen.contains(*n)) {
            return Err(PipelineError::Config(format!(
                "output schema is missing `{missing}`"
            )));
        }

        let fees = &self.fees;
        for name in [
            &fees.service_column,
            &fees.quantity_column,
            &fees.total_column,
        ] {
            if !self.columns.iter().any(|c| &c.name == name) {
                return Err(PipelineError::Config(format!(
                    "fee column `{name}` is not retained"
                )));
            }
        }
        Ok(())
    }
}
