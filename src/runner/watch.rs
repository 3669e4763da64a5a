//! Form watcher.
//!
//! A poller reads the page agent's counters and turns them into
//! [`PageEvent`]s on a channel. The consumer debounces bursts of changes into
//! one detection pass, surfaces the entry point when the form appears, and
//! fills the configured template when asked.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use vitals_engine::FillMode;

use super::Runner;
use crate::config::WatchConfig;
use crate::page::{self, PageSignals};
use crate::{Error, Result};

/// What the watcher does once the form is found.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Template to fill. Filled when the form first appears and again on
    /// every click of the entry point.
    pub auto_fill: Option<String>,
    pub mode: FillMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageEvent {
    /// The element tree changed.
    Changed,
    /// The entry point was clicked.
    Requested,
}

/// A debounced batch of page events.
#[derive(Debug, Default, PartialEq, Eq)]
struct Batch {
    changed: bool,
    requested: bool,
}

impl Batch {
    fn add(&mut self, event: PageEvent) {
        match event {
            PageEvent::Changed => self.changed = true,
            PageEvent::Requested => self.requested = true,
        }
    }
}

/// Wait for the next event, then keep collecting until the channel has been
/// quiet for `window`. Returns `None` once the channel is closed and drained.
async fn next_batch(rx: &mut mpsc::Receiver<PageEvent>, window: Duration) -> Option<Batch> {
    let mut batch = Batch::default();
    batch.add(rx.recv().await?);
    loop {
        match timeout(window, rx.recv()).await {
            Ok(Some(event)) => batch.add(event),
            Ok(None) | Err(_) => return Some(batch),
        }
    }
}

/// Events implied by moving from `last` to `now`.
fn diff(last: &PageSignals, now: &PageSignals) -> Vec<PageEvent> {
    let mut events = Vec::new();
    // counters restart at zero when a navigation reinstalls the agent
    if now.changes != last.changes || !now.installed {
        events.push(PageEvent::Changed);
    }
    // the page dropped our entry point; surface it again
    if last.entry_point && !now.entry_point && !events.contains(&PageEvent::Changed) {
        events.push(PageEvent::Changed);
    }
    if now.requests > last.requests {
        events.push(PageEvent::Requested);
    }
    events
}

/// A failed read counts as a page without the agent. Reads fail while a
/// navigation tears down the execution context.
fn or_uninstalled(read: Result<PageSignals>) -> PageSignals {
    read.unwrap_or_else(|e| {
        warn!("Reading page signals failed: {}", e);
        PageSignals::default()
    })
}

async fn poll(runner: &Runner, every: Duration, tx: mpsc::Sender<PageEvent>) -> Result<()> {
    let mut last = or_uninstalled(page::signals(runner.page()).await);
    loop {
        sleep(every).await;
        if tx.is_closed() {
            return Ok(());
        }
        let mut now = or_uninstalled(page::signals(runner.page()).await);
        if !now.installed {
            debug!("Page agent gone, reinstalling");
            if let Err(e) = page::install_agent(runner.page()).await {
                warn!("Reinstalling page agent failed: {}", e);
                continue;
            }
            now = PageSignals {
                installed: true,
                ..Default::default()
            };
            // the fresh document may hold the form
            if tx.send(PageEvent::Changed).await.is_err() {
                return Ok(());
            }
        }
        for event in diff(&last, &now) {
            if tx.send(event).await.is_err() {
                return Ok(());
            }
        }
        last = now;
    }
}

/// One detection pass. Returns true if the entry point was newly added.
async fn surface(runner: &Runner, options: &WatchOptions) -> Result<bool> {
    let detection = runner.detect().await?;
    if !detection.detected {
        debug!("No vitals form on {}", detection.url);
        return Ok(false);
    }
    let label = match options.auto_fill {
        Some(ref name) => format!("Vitals: {}", name),
        None => "Vitals".to_string(),
    };
    let added = page::show_entry_point(runner.page(), &label).await?;
    if added {
        info!("Vitals form detected on {}", detection.url);
    }
    Ok(added)
}

async fn fill_requested(runner: &Runner, options: &WatchOptions) -> Result<()> {
    let Some(ref name) = options.auto_fill else {
        warn!("Entry point clicked but no template was given");
        return Ok(());
    };
    match runner.fill(name, options.mode).await {
        Ok(outcome) => {
            debug!("Fill committed: {:?}", outcome.commit);
            Ok(())
        }
        Err(Error::Busy) => {
            debug!("Fill already running, request dropped");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn consume(
    runner: &Runner,
    config: &WatchConfig,
    options: &WatchOptions,
    mut rx: mpsc::Receiver<PageEvent>,
) -> Result<()> {
    if surface(runner, options).await? && options.auto_fill.is_some() {
        fill_requested(runner, options).await?;
    }

    while let Some(batch) = next_batch(&mut rx, config.debounce()).await {
        debug!("Page events: {:?}", batch);
        let mut fill = batch.requested;
        if batch.changed {
            let added = surface(runner, options).await?;
            fill |= added && options.auto_fill.is_some();
        }
        if fill {
            fill_requested(runner, options).await?;
        }
    }
    Ok(())
}

/// Watch the runner's page until the page or browser goes away.
///
/// The first detection runs after `initial_delay_ms`. After that, page
/// changes are debounced by `debounce_ms` and re-checked; the entry point is
/// never added twice.
pub async fn watch(runner: &Runner, config: &WatchConfig, options: &WatchOptions) -> Result<()> {
    sleep(config.initial_delay()).await;
    page::install_agent(runner.page()).await?;

    let (tx, rx) = mpsc::channel(100);
    let (polled, consumed) = tokio::join!(
        poll(runner, config.poll(), tx),
        consume(runner, config, options, rx)
    );
    consumed?;
    polled
}
