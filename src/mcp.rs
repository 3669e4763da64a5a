use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use vitals_engine::FillMode;
use vitals_store::Store;

use crate::{Config, Error, Runner};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ERR_NO_BROWSER: &str = "No browser open. Use navigate first.";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NavigateRequest {
    #[schemars(description = "URL of the page holding the vitals form")]
    pub url: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AutofillRequest {
    #[schemars(description = "Template name (exact, or case-insensitive)")]
    pub template: String,
    #[schemars(description = "Fill only the temperature and Prior rows (default false)")]
    pub partial: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SnippetSearchRequest {
    #[schemars(description = "Text to find in snippet titles or bodies (case-insensitive). Empty lists all.")]
    pub term: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct InsertSnippetRequest {
    #[schemars(description = "Search term; the first matching snippet is inserted into the focused field")]
    pub term: String,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn err(e: impl std::fmt::Display) -> ErrorData {
    ErrorData::internal_error(e.to_string(), None::<Value>)
}

fn text_ok(s: impl Into<String>) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(s.into())]))
}

#[derive(Clone)]
pub struct VitalsServer {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    runner: Arc<Mutex<Option<Runner>>>,
    tool_router: ToolRouter<Self>,
}

impl VitalsServer {
    async fn ensure_runner(&self, guard: &mut Option<Runner>) -> Result<(), ErrorData> {
        if guard.is_none() {
            let runner = Runner::with_store(&self.config, self.store.clone())
                .await
                .map_err(err)?;
            *guard = Some(runner);
        }
        Ok(())
    }
}

#[tool_router]
impl VitalsServer {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            runner: Arc::new(Mutex::new(None)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Navigate to a URL. Launches browser on first call. Reports whether the vitals form is present.")]
    async fn navigate(&self, req: Parameters<NavigateRequest>) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.runner.lock().await;
        self.ensure_runner(&mut guard).await?;
        let runner = guard.as_ref().ok_or_else(|| err(ERR_NO_BROWSER))?;
        runner.goto(&req.0.url).await.map_err(err)?;
        let title = runner.page().title().await.map_err(err)?;
        let detection = runner.detect().await.map_err(err)?;
        text_ok(format!(
            "Navigated to: {}\nTitle: {}\nVitals form: {}",
            detection.url,
            title,
            if detection.detected { "present" } else { "absent" }
        ))
    }

    #[tool(description = "Check the current page for the vitals form. Lists the matched field signatures.")]
    async fn detect_form(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.runner.lock().await;
        let runner = guard.as_ref().ok_or_else(|| err(ERR_NO_BROWSER))?;
        let detection = runner.detect().await.map_err(err)?;
        if detection.detected {
            text_ok(format!(
                "Vitals form detected on {}\nSignatures: {}",
                detection.url,
                detection.matched.join(", ")
            ))
        } else {
            text_ok(format!("No vitals form on {}", detection.url))
        }
    }

    #[tool(description = "List stored vitals templates with a preview of their values.")]
    async fn list_templates(&self) -> Result<CallToolResult, ErrorData> {
        let templates = vitals_store::load_templates(self.store.as_ref())
            .await
            .map_err(err)?;
        if templates.is_empty() {
            return text_ok("No templates stored.");
        }
        let list: Vec<String> = templates
            .iter()
            .map(|t| format!("{}: {}", t.name, t.preview(FillMode::Full)))
            .collect();
        text_ok(list.join("\n"))
    }

    #[tool(description = "Fill the vitals form on the current page from a stored template. Fails if a fill is already running.")]
    async fn autofill(&self, req: Parameters<AutofillRequest>) -> Result<CallToolResult, ErrorData> {
        let guard = self.runner.try_lock().map_err(|_| err(Error::Busy))?;
        let runner = guard.as_ref().ok_or_else(|| err(ERR_NO_BROWSER))?;
        let mode = if req.0.partial.unwrap_or(false) {
            FillMode::Partial
        } else {
            FillMode::Full
        };
        let outcome = runner.fill(&req.0.template, mode).await.map_err(err)?;

        let mut out = outcome.report.message();
        for field in outcome.report.outcomes.iter().filter(|o| !o.status.is_filled()) {
            out.push_str(&format!("\n  {}: {}", field.slot, field.status));
        }
        if outcome.commit.missing > 0 {
            out.push_str(&format!(
                "\n{} writes missed: the page changed during the fill",
                outcome.commit.missing
            ));
        }
        text_ok(out)
    }

    #[tool(description = "Search saved text snippets by title or body.")]
    async fn search_snippets(
        &self,
        req: Parameters<SnippetSearchRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let term = req.0.term.unwrap_or_default();
        let book = vitals_store::load_snippets(self.store.as_ref())
            .await
            .map_err(err)?;
        let categories = vitals_store::load_categories(self.store.as_ref())
            .await
            .map_err(err)?;
        let hits = vitals_store::search_snippets(&book, &categories, &term);
        if hits.is_empty() {
            return text_ok("No snippets found.");
        }
        let list: Vec<String> = hits
            .iter()
            .map(|h| format!("[{}] {}: {}", h.category_label, h.snippet.title, h.snippet.text))
            .collect();
        text_ok(list.join("\n"))
    }

    #[tool(description = "Insert the first snippet matching a search term into the focused text field.")]
    async fn insert_snippet(
        &self,
        req: Parameters<InsertSnippetRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let guard = self.runner.lock().await;
        let runner = guard.as_ref().ok_or_else(|| err(ERR_NO_BROWSER))?;
        let inserted = runner.insert_snippet(&req.0.term).await.map_err(err)?;
        text_ok(format!("Inserted \"{}\"", inserted.hit.snippet.title))
    }

    #[tool(description = "Close the browser and release resources.")]
    async fn close(&self) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.runner.lock().await;
        if let Some(runner) = guard.take() {
            runner.close().await.map_err(err)?;
        }
        text_ok("Browser closed.")
    }
}

#[tool_handler]
impl ServerHandler for VitalsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "vitals-fill".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Vitals form autofill. Use 'navigate' to open the visit page (launches browser automatically), \
                 'detect_form' to confirm the vitals form is there, 'list_templates' to see stored values, \
                 then 'autofill' with a template name (partial=true fills only temperature and Prior). \
                 'search_snippets' and 'insert_snippet' put saved text into the focused field."
                    .into(),
            ),
        }
    }
}

pub async fn run_server(config: Config, store: Arc<dyn Store>) -> anyhow::Result<()> {
    use rmcp::ServiceExt;

    let server = VitalsServer::new(config, store);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
