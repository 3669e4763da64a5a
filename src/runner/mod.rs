mod watch;

pub use watch::{watch, WatchOptions};

use crate::config::{Config, NotifyConfig, StoreConfig};
use crate::notify::{LogNotifier, Notifier};
use crate::page::{self, CommitSummary};
use crate::{Error, Result};
use eoka::{Browser, Page};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vitals_engine::{
    detect::matched_signatures, insert_snippet, is_snippet_target, Autofill, FillMode, FillReport,
    Template,
};
use vitals_store::{JsonFileStore, MemoryStore, SnippetHit, Store};

/// Open the store named by `config`, or an in-memory one without a path.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    Ok(match config.path {
        Some(ref path) => {
            debug!("Opening store: {}", path.display());
            Arc::new(JsonFileStore::open(path).await?)
        }
        None => {
            warn!("No store.path configured, templates are kept in memory");
            Arc::new(MemoryStore::new())
        }
    })
}

/// Result of a form detection pass.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Whether the vitals form signature is present.
    pub detected: bool,
    /// Signatures that matched, as `attr~needle`.
    pub matched: Vec<String>,
    /// URL of the page that was inspected.
    pub url: String,
}

/// Result of one fill against the live page.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub report: FillReport,
    pub commit: CommitSummary,
}

/// Result of a snippet insertion.
#[derive(Debug, Clone)]
pub struct SnippetInsert {
    pub hit: SnippetHit,
    pub commit: CommitSummary,
}

/// Drives fills against one browser page.
///
/// Only one write (fill or snippet insertion) runs at a time. A second one
/// started while the first is in flight fails with [`Error::Busy`].
pub struct Runner {
    browser: Browser,
    page: Page,
    store: Arc<dyn Store>,
    autofill: Autofill,
    notify: NotifyConfig,
    notifier: Box<dyn Notifier>,
    running: Mutex<()>,
}

impl Runner {
    /// Launch a browser and open the configured store.
    pub async fn new(config: &Config) -> Result<Self> {
        let store = open_store(&config.store).await?;
        Self::with_store(config, store).await
    }

    /// Launch a browser using an existing store.
    pub async fn with_store(config: &Config, store: Arc<dyn Store>) -> Result<Self> {
        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.browser.headless, config.browser.proxy
        );
        let browser = Browser::launch_with_config(config.browser.stealth()).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser,
            page,
            store,
            autofill: Autofill::new((&config.fill).into()),
            notify: config.notify.clone(),
            notifier: Box::new(LogNotifier),
            running: Mutex::new(()),
        })
    }

    /// Replace the notifier that receives fill reports.
    pub fn set_notifier(&mut self, notifier: Box<dyn Notifier>) {
        self.notifier = notifier;
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Navigate the page.
    pub async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to: {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    /// Check the current page for the vitals form signature.
    pub async fn detect(&self) -> Result<Detection> {
        let doc = page::capture(&self.page).await?;
        let matched: Vec<String> = matched_signatures(&doc, self.autofill.schema().signatures)
            .into_iter()
            .map(|s| format!("{}~{}", s.attr.as_str(), s.needle))
            .collect();
        let url = self.page.url().await?;
        debug!("Detection on {}: {:?}", url, matched);
        Ok(Detection {
            detected: !matched.is_empty(),
            matched,
            url,
        })
    }

    /// Fill the stored template called `name`.
    pub async fn fill(&self, name: &str, mode: FillMode) -> Result<FillOutcome> {
        let template = vitals_store::find_template(self.store.as_ref(), name)
            .await?
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;
        self.fill_template(&template, mode).await
    }

    /// Fill `template` into the current page.
    pub async fn fill_template(&self, template: &Template, mode: FillMode) -> Result<FillOutcome> {
        let _running = self.running.try_lock().map_err(|_| Error::Busy)?;

        let mut doc = page::capture(&self.page).await?;
        let mut report = self.autofill.run(&mut doc, template, mode);
        let journal = doc.take_journal();
        let commit = page::commit(&self.page, &doc, &journal).await?;
        commit.reconcile(&doc, &mut report);

        self.announce(&report).await;
        Ok(FillOutcome { report, commit })
    }

    /// Insert the first snippet matching `term` into the focused element.
    pub async fn insert_snippet(&self, term: &str) -> Result<SnippetInsert> {
        let hit = self
            .snippets(term)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::SnippetNotFound(term.to_string()))?;

        let _running = self.running.try_lock().map_err(|_| Error::Busy)?;
        let mut doc = page::capture(&self.page).await?;
        let target = doc
            .active_element()
            .filter(|&node| is_snippet_target(&doc, node))
            .ok_or(Error::NoSnippetTarget)?;
        if !insert_snippet(&mut doc, target, &hit.snippet.text) {
            return Err(Error::NoSnippetTarget);
        }
        let journal = doc.take_journal();
        let commit = page::commit(&self.page, &doc, &journal).await?;
        info!("Inserted snippet '{}'", hit.snippet.title);
        Ok(SnippetInsert { hit, commit })
    }

    /// All stored templates.
    pub async fn templates(&self) -> Result<Vec<Template>> {
        Ok(vitals_store::load_templates(self.store.as_ref()).await?)
    }

    /// Saved snippets whose title or text contains `term`. An empty term lists all.
    pub async fn snippets(&self, term: &str) -> Result<Vec<SnippetHit>> {
        let book = vitals_store::load_snippets(self.store.as_ref()).await?;
        let categories = vitals_store::load_categories(self.store.as_ref()).await?;
        Ok(vitals_store::search_snippets(&book, &categories, term))
    }

    async fn announce(&self, report: &FillReport) {
        if let Err(e) = self.notifier.notify(report).await {
            warn!("Notifier failed: {}", e);
        }
        if self.notify.toast {
            if let Err(e) =
                page::show_notice(&self.page, &report.message(), self.notify.display_ms).await
            {
                warn!("Failed to show notice: {}", e);
            }
        }
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("schema", &self.autofill.schema().version)
            .field("notify", &self.notify)
            .finish_non_exhaustive()
    }
}
