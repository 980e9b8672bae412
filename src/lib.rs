//! Two-stage transform for service-order exports.
//!
//! - [`clean`] keeps completed orders, projects the billing columns and
//!   derives the `Prepaid` / `Prepaid+Total` surcharge columns.
//! - [`summarize`] sorts the cleaned rows by day and agent crew and follows
//!   each crew's rows with a subtotal row and a blank spacer row.
pub mod clean;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod output;
pub mod summarize;
pub mod types;
pub mod util;

pub use clean::{clean_table, run_clean};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use summarize::{run_process, summarize_table};
pub use types::{CleanStats, SummaryStats, Table};
