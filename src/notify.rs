//! Completion notices.

use async_trait::async_trait;
use tracing::{info, warn};
use vitals_engine::FillReport;

use crate::Result;

/// Receives the report of every finished fill.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &FillReport) -> Result<()>;
}

/// Writes the notice to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, report: &FillReport) -> Result<()> {
        if report.filled() > 0 {
            info!("{}", report.message());
        } else {
            warn!("{}", report.message());
        }
        Ok(())
    }
}

/// Prints the notice and, with `detail`, every slot's outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier {
    pub detail: bool,
}

impl StdoutNotifier {
    pub fn detailed() -> Self {
        Self { detail: true }
    }

    fn render(&self, report: &FillReport) -> String {
        let mut out = report.message();
        if self.detail {
            for outcome in &report.outcomes {
                out.push_str(&format!("\n  {:?} {}: {}", outcome.row, outcome.slot, outcome.status));
            }
        }
        out
    }
}

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, report: &FillReport) -> Result<()> {
        println!("{}", self.render(report));
        Ok(())
    }
}
