//! # vitals-fill
//!
//! Fill a vitals-entry form on a live browser page from a stored template.
//!
//! The page is captured into a [`vitals_engine::Document`], the engine locates
//! and writes the fields, and the recorded writes are replayed on the page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vitals_fill::{Config, FillMode, Runner};
//!
//! # #[tokio::main]
//! # async fn main() -> vitals_fill::Result<()> {
//! let config = Config::load("vitals.yaml")?;
//! let runner = Runner::new(&config).await?;
//! runner.goto(config.target_url()?).await?;
//! let outcome = runner.fill("Baseline", FillMode::Partial).await?;
//! println!("{}", outcome.report.message());
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mcp;
pub mod notify;
pub mod page;
pub mod runner;

pub use config::{BrowserConfig, Config, FillConfig, NotifyConfig, StoreConfig, WatchConfig};
pub use notify::{LogNotifier, Notifier, StdoutNotifier};
pub use page::{CommitSummary, PageSignals};
pub use runner::{open_store, watch, Detection, FillOutcome, Runner, SnippetInsert, WatchOptions};
pub use vitals_engine::{FillMode, FillReport, Template, VitalField};

/// Result type for vitals-fill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading config or driving a page.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("store error: {0}")]
    Store(#[from] vitals_store::StoreError),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("snippet not found: {0}")]
    SnippetNotFound(String),

    #[error("focused element does not accept text")]
    NoSnippetTarget,

    #[error("a fill is already running")]
    Busy,
}
