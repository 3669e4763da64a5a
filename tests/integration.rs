//! Integration tests for vitals-fill
//!
//! Browser tests require Chrome to be installed and available.
//! Run with: cargo test --test integration -- --ignored

use std::sync::Arc;

use vitals_engine::{ChoiceField, FieldStatus, Slot};
use vitals_fill::{page, Config, Error, FillMode, Runner, Template, VitalField};
use vitals_store::{upsert_template, MemoryStore, Store, SNIPPETS_KEY};

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

const VITALS_PAGE: &str = r#"data:text/html,
<table>
  <tr><td>Temperature:</td>
    <td><input type="text" name="temperature"></td>
    <td><select name="taken"><option></option><option>Oral</option><option>Axillary</option><option>Rectal</option><option>Temporal</option></select></td>
  </tr>
</table>
<table>
  <tr><th>When</th><th>BP</th><th>BP</th><th>Pulse</th><th>Resp</th><th>Position</th><th>Side</th></tr>
  <tr><td>Prior</td>
    <td><input type="text" name="bp_prior_sys" oninput="this.value=''"></td>
    <td><input type="text" name="bp_prior_dia"></td>
    <td><input type="text" name="heart_prior"></td>
    <td><input type="text" name="resp_prior"></td>
    <td><select><option></option><option>Lying</option><option>Sitting</option><option>Standing</option></select></td>
    <td><select><option></option><option>Left</option><option>Right</option></select></td>
  </tr>
  <tr><td>During</td>
    <td><input type="text" name="bp_during_sys"></td>
    <td><input type="text" name="bp_during_dia"></td>
    <td><input type="text" name="heart_during"></td>
    <td><input type="text" name="resp_during"></td>
    <td><select><option></option><option>Lying</option><option>Sitting</option><option>Standing</option></select></td>
    <td><select><option></option><option>Left</option><option>Right</option></select></td>
  </tr>
  <tr><td>Post</td>
    <td><input type="text" name="bp_post_sys"></td>
    <td><input type="text" name="bp_post_dia"></td>
    <td><input type="text" name="heart_post"></td>
    <td><input type="text" name="resp_post"></td>
    <td><select><option></option><option>Lying</option><option>Sitting</option><option>Standing</option></select></td>
    <td><select><option></option><option>Left</option><option>Right</option></select></td>
  </tr>
</table>
"#;

fn baseline() -> Template {
    Template::new(1, "Baseline")
        .with(VitalField::Temperature, "98.6")
        .with(VitalField::BpPrior1, "120")
        .with(VitalField::BpPrior2, "80")
        .with(VitalField::HeartRatePrior, "72")
        .with(VitalField::RespirationsPrior, "16")
        .with(VitalField::BpPost1, "118")
        .with(VitalField::BpPost2, "78")
        .with(VitalField::HeartRatePost, "70")
        .with(VitalField::RespirationsPost, "16")
}

async fn runner_with(store: Arc<dyn Store>) -> Runner {
    let config = Config::parse(
        r#"
browser:
  headless: true
notify:
  toast: false
"#,
    )
    .unwrap();
    Runner::with_store(&config, store)
        .await
        .expect("Failed to launch browser")
}

async fn vitals_runner() -> Runner {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    upsert_template(store.as_ref(), baseline()).await.unwrap();
    let runner = runner_with(store).await;
    runner.goto(VITALS_PAGE).await.expect("Failed to navigate");
    runner
}

async fn input_values(runner: &Runner) -> Vec<String> {
    let json: String = runner
        .page()
        .evaluate("JSON.stringify(Array.from(document.querySelectorAll('input')).map(i => i.value))")
        .await
        .unwrap();
    serde_json::from_str(&json).unwrap()
}

async fn selected_indexes(runner: &Runner) -> Vec<i64> {
    let json: String = runner
        .page()
        .evaluate(
            "JSON.stringify(Array.from(document.querySelectorAll('select')).map(s => s.selectedIndex))",
        )
        .await
        .unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_load_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vitals.yaml");
    std::fs::write(
        &path,
        "target:\n  url: \"https://example.com/vitals\"\nstore:\n  path: \"store.json\"\n",
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.target_url().unwrap(), "https://example.com/vitals");
    assert!(config.store.path.is_some());
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_open_store_uses_configured_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let config = Config::parse(&format!("store:\n  path: {:?}\n", path)).unwrap();

    let store = vitals_fill::open_store(&config.store).await.unwrap();
    upsert_template(store.as_ref(), baseline()).await.unwrap();
    assert!(path.exists());

    let reopened = vitals_fill::open_store(&config.store).await.unwrap();
    let templates = vitals_store::load_templates(reopened.as_ref()).await.unwrap();
    assert_eq!(templates, vec![baseline()]);
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_detect_vitals_form() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let runner = vitals_runner().await;
    let detection = runner.detect().await.expect("Failed to detect");
    assert!(detection.detected);
    assert!(detection.matched.contains(&"name~temperature".to_string()));

    runner.goto("data:text/html,<p>Nothing here</p>").await.unwrap();
    assert!(!runner.detect().await.unwrap().detected);

    runner.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_full_fill_writes_prior_and_post() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let runner = vitals_runner().await;
    let outcome = runner
        .fill("baseline", FillMode::Full)
        .await
        .expect("Failed to fill");

    assert_eq!(outcome.report.filled(), 14, "{:?}", outcome.report);
    assert_eq!(outcome.commit.missing, 0);

    let values = input_values(&runner).await;
    assert_eq!(
        values,
        vec![
            "98.6", "120", "80", "72", "16", // temperature, prior
            "", "", "", "", // during
            "118", "78", "70", "16", // post
        ]
    );
    // site, prior position/side, during position/side, post position/side
    assert_eq!(selected_indexes(&runner).await, vec![4, 2, 1, 0, 0, 2, 1]);

    runner.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_listener_reset_is_restored() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let runner = vitals_runner().await;
    let outcome = runner.fill("Baseline", FillMode::Partial).await.unwrap();

    // the first Prior input clears itself on input
    assert!(outcome.commit.restored >= 1);
    assert_eq!(outcome.commit.restored_handles.len(), 1);
    assert_eq!(input_values(&runner).await[1], "120");
    assert_eq!(
        outcome.report.status(Slot::Choice(ChoiceField::PositionPost)),
        None
    );
    assert_eq!(
        outcome.report.status(Slot::Text(VitalField::BpPrior1)),
        Some(FieldStatus::Restored)
    );
    assert_eq!(
        outcome.report.status(Slot::Text(VitalField::BpPrior2)),
        Some(FieldStatus::Filled)
    );
    assert_eq!(outcome.report.filled(), 8);
    assert_eq!(input_values(&runner).await[9], "");

    runner.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_concurrent_fill_is_rejected() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let runner = vitals_runner().await;
    let (first, second) = tokio::join!(
        runner.fill("Baseline", FillMode::Full),
        runner.fill("Baseline", FillMode::Full)
    );
    let busy = [&first, &second]
        .iter()
        .filter(|r| matches!(r, Err(Error::Busy)))
        .count();
    assert_eq!(busy, 1);
    assert!(first.is_ok() || second.is_ok());

    runner.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_unknown_template() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let runner = vitals_runner().await;
    let result = runner.fill("Nope", FillMode::Full).await;
    assert!(matches!(result, Err(Error::TemplateNotFound(_))));
    assert!(input_values(&runner).await.iter().all(|v| v.is_empty()));

    runner.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_insert_snippet_into_focused_textarea() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store
        .set(
            SNIPPETS_KEY,
            serde_json::json!({
                "notas": [{"id": 1, "title": "Stable", "text": "Patient stable, no distress."}]
            }),
        )
        .await
        .unwrap();
    let runner = runner_with(store).await;
    runner
        .goto("data:text/html,<textarea id=notes></textarea><script>document.getElementById('notes').focus()</script>")
        .await
        .unwrap();

    let inserted = runner.insert_snippet("stable").await.expect("Failed to insert");
    assert_eq!(inserted.hit.snippet.title, "Stable");

    let value: String = runner
        .page()
        .evaluate("document.getElementById('notes').value")
        .await
        .unwrap();
    assert_eq!(value, "Patient stable, no distress.");

    assert!(matches!(
        runner.insert_snippet("missing").await,
        Err(Error::SnippetNotFound(_))
    ));

    runner.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_entry_point_added_once() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let runner = vitals_runner().await;
    assert!(page::install_agent(runner.page()).await.unwrap());
    assert!(!page::install_agent(runner.page()).await.unwrap());

    assert!(page::show_entry_point(runner.page(), "Vitals").await.unwrap());
    assert!(!page::show_entry_point(runner.page(), "Vitals").await.unwrap());

    let signals = page::signals(runner.page()).await.unwrap();
    assert!(signals.installed);
    assert!(signals.entry_point);
    // our own element does not count as a page change
    assert_eq!(signals.changes, 0);

    runner
        .page()
        .execute("document.body.appendChild(document.createElement('div'))")
        .await
        .unwrap();
    runner.page().wait(50).await;
    assert!(page::signals(runner.page()).await.unwrap().changes >= 1);

    runner.close().await.expect("Failed to close browser");
}
