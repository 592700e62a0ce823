
use std::sync::Arc;

use flowdash::analytics::project::PROJECT_KEY;
use flowdash::analytics::{AnalyticsDashboard, Project, RecordingCharts};
use flowdash::core::api::PROJECT_HEADER;
use flowdash::core::clipboard::MemoryClipboard;
use flowdash::core::config::{CONFIG_FILE, StorageBackend};
use flowdash::links::LinksPage;
use flowdash::{DashboardConfig, FileStore, KeyValueStore};
use mock_backend::{MockBackend, TestResult};
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn controllers_start_from_config_file() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("controllers_start_from_config_file").await?
    else {
        return Ok(());
    };

    let dir = tempfile::tempdir()?;
    let store_path = dir.path().join("state").join("storage.json");
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        format!(
            "api_base = {:?}\npublic_origin = \"https://flowcabinet.ru/\"\ndefault_project = \"Fulfillment\"\n\n[storage]\nbackend = \"file\"\npath = {:?}\n\n[logging]\nlevel = \"debug\"\nstdout = false\nmirror_capacity = 1024\n",
            format!("{}/", backend.api_base()),
            store_path.display().to_string()
        ),
    )?;
    let config = DashboardConfig::load(dir.path()).await?;
    assert_eq!(config.api_base, backend.api_base());
    assert_eq!(config.public_origin, "https://flowcabinet.ru");
    assert_eq!(config.storage.backend, StorageBackend::File);
    let mirror = flowdash::logging::init(&config.logging);
    let mut log = mirror.subscribe();

    backend.on_json("GET", "/stats", 200, json!({"total": 1}));
    backend.on_json("GET", "/runs", 200, json!([]));
    backend.on_json("GET", "/stats/timeline", 200, json!([]));
    backend.on_json("GET", "/server-services", 200, json!({"services": []}));

    let mut dashboard = AnalyticsDashboard::from_config(
        &config,
        Box::new(RecordingCharts::new()),
        Arc::new(MemoryClipboard::new()),
    )?;
    assert_eq!(dashboard.project(), Project::Fulfilment);
    dashboard.start().await;
    assert_eq!(
        backend.requests_to("GET", "/stats")[0].header(PROJECT_HEADER),
        Some("fulfilment")
    );
    dashboard.switch_project(Project::Flow).await;
    drop(dashboard);

    let reopened = FileStore::open(&store_path, config.storage.quota_bytes)?;
    assert_eq!(reopened.get(PROJECT_KEY)?.as_deref(), Some("flow"));

    backend.on_json("GET", "/config", 200, json!({"require_auth": false}));
    backend.on_json(
        "GET",
        "/links",
        200,
        json!({"items": [{"id": "r", "url": "/l/r.png"}], "total": 1}),
    );
    let clipboard = MemoryClipboard::new();
    let mut links = LinksPage::from_config(&config, Arc::new(clipboard.clone()))?;
    links.start().await;
    links.copy_link(0).await;
    assert_eq!(
        clipboard.last().as_deref(),
        Some("https://flowcabinet.ru/l/r.png")
    );

    let mut lines = Vec::new();
    loop {
        match log.try_recv() {
            Ok(line) => lines.push(line),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert!(
        lines
            .iter()
            .any(|l| l.contains("INFO") && l.contains("Analytics dashboard starting for fulfilment")),
        "log lines: {:?}",
        lines
    );
    assert!(lines.iter().any(|l| l.contains("DEBUG")), "debug level not applied: {:?}", lines);
    assert!(lines.iter().all(|l| !l.ends_with('\n')));

    backend.shutdown().await;
    Ok(())
}
