
use std::sync::Arc;
use std::time::Instant;

use flowdash::core::clipboard::{COPIED_LABEL, MemoryClipboard};
use flowdash::imageweb::app::{
    DOWNLOAD_BUTTON, IMPROVE_BUTTON, LOADING_SECTION, RESULT_PREVIEW, RESULT_SECTION,
};
use flowdash::imageweb::draft::DRAFT_KEY;
use flowdash::imageweb::form::{ADD_REF_BUTTON, IMPROVED_PANEL, PROMPT_INPUT};
use flowdash::imageweb::generate::{
    AUTH_REQUIRED, GENERATION_FAILED, IMPROVE_NEEDS_PROMPT, REFS_TOO_LARGE, SERVER_ERROR,
};
use flowdash::imageweb::history::{HISTORY_EMPTY, HISTORY_FAILED, HISTORY_LIST, HISTORY_POPUP};
use flowdash::imageweb::session::{
    LOCAL_MODE_LABEL, LOGIN_CONTAINER, LOGIN_NO_BOT, LOGOUT_BUTTON, SCREEN_LOGIN, SCREEN_MAIN,
    TelegramAuth, USER_NAME,
};
use flowdash::imageweb::refs::RefSlot;
use flowdash::imageweb::{Draft, ImageWebApp, SelectedFile};
use flowdash::{FileStore, MemoryStore, Storage};
use mock_backend::{MockBackend, TestResult};
use serde_json::json;

fn app(backend: &MockBackend, storage: Storage) -> ImageWebApp {
    ImageWebApp::new(
        backend.client(),
        storage,
        Arc::new(MemoryClipboard::new()),
    )
}

fn png(name: &str, bytes: &'static [u8]) -> SelectedFile {
    SelectedFile::new(name, "image/png", bytes)
}

fn local_mode(backend: &MockBackend) {
    backend.on_json("GET", "/config", 200, json!({"require_auth": false}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn local_mode_restores_saved_draft() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("local_mode_restores_saved_draft").await? else {
        return Ok(());
    };
    local_mode(&backend);
    let storage: Storage = Arc::new(MemoryStore::new());
    let saved = Draft {
        prompt: "кот".to_string(),
        improved_prompt: "рыжий кот на крыше".to_string(),
        use_improved: true,
        refs: vec![
            "data:image/png;base64,AAA=".to_string(),
            "data:image/png;base64,BBB=".to_string(),
            "data:image/png;base64,CCC=".to_string(),
        ],
        format: "1536x1024".to_string(),
    };
    storage.set(DRAFT_KEY, &serde_json::to_string(&saved)?)?;

    let mut app = app(&backend, storage);
    app.start().await;

    let surface = app.surface();
    assert_eq!(surface.text(USER_NAME), LOCAL_MODE_LABEL);
    assert!(surface.is_hidden(LOGOUT_BUTTON));
    assert!(!surface.is_hidden(SCREEN_MAIN));
    assert!(surface.is_hidden(SCREEN_LOGIN));
    assert_eq!(surface.attr(PROMPT_INPUT, "value"), Some("кот"));
    assert!(!surface.is_hidden(IMPROVED_PANEL));
    assert!(!surface.is_hidden(ADD_REF_BUTTON));
    // Three restored references plus an empty row to add another.
    assert_eq!(app.form().refs.len(), 4);
    assert_eq!(app.form().refs.data_urls(), saved.refs);
    assert!(backend.requests_to("GET", "/me").is_empty());

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn telegram_login_flow() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("telegram_login_flow").await? else {
        return Ok(());
    };
    backend.on_json(
        "GET",
        "/config",
        200,
        json!({"require_auth": true, "bot_username": "flow_images_bot"}),
    );
    backend.on_json("GET", "/me", 200, json!({"authenticated": false}));
    let mut app = app(&backend, Arc::new(MemoryStore::new()));
    app.start().await;

    assert!(app.surface().is_hidden(SCREEN_MAIN));
    assert!(!app.surface().is_hidden(SCREEN_LOGIN));
    assert!(
        app.surface()
            .html(LOGIN_CONTAINER)
            .contains("data-telegram-login=\"flow_images_bot\"")
    );
    assert!(app.surface().is_hidden(LOGIN_NO_BOT));

    let payload = TelegramAuth {
        id: 5001,
        first_name: Some("Иван".to_string()),
        auth_date: 1_760_000_000,
        hash: "f00d".to_string(),
        ..TelegramAuth::default()
    };

    backend.on_json(
        "POST",
        "/auth/telegram",
        403,
        json!({"detail": "Подпись недействительна"}),
    );
    app.on_telegram_auth(payload.clone()).await;
    assert_eq!(
        app.surface_mut().take_alerts(),
        vec!["Ошибка входа: Подпись недействительна".to_string()]
    );
    assert!(app.surface().is_hidden(SCREEN_MAIN));

    backend.on_json("POST", "/auth/telegram", 200, json!({"ok": true}));
    app.on_telegram_auth(payload).await;
    assert_eq!(app.surface().text(USER_NAME), "Иван");
    assert!(!app.surface().is_hidden(SCREEN_MAIN));
    assert!(!app.surface().is_hidden(LOGOUT_BUTTON));

    let sent = backend.requests_to("POST", "/auth/telegram");
    let body = sent.last().and_then(|r| r.json()).ok_or("no login body")?;
    assert_eq!(body["id"], json!(5001));
    assert_eq!(body["hash"], json!("f00d"));
    assert!(body.get("username").is_none());

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_bot_shows_notice() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("missing_bot_shows_notice").await? else {
        return Ok(());
    };
    backend.on_json("GET", "/config", 200, json!({"require_auth": true}));
    backend.on_json("GET", "/me", 500, json!({"detail": "session store down"}));
    let mut app = app(&backend, Arc::new(MemoryStore::new()));
    app.start().await;

    assert!(!app.surface().is_hidden(LOGIN_NO_BOT));
    assert!(app.surface().is_hidden(SCREEN_MAIN));
    assert_eq!(app.surface().html(LOGIN_CONTAINER), "");

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logout_returns_to_login() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("logout_returns_to_login").await? else {
        return Ok(());
    };
    backend.on_json(
        "GET",
        "/config",
        200,
        json!({"require_auth": true, "bot_username": "flow_images_bot"}),
    );
    backend.on_json(
        "GET",
        "/me",
        200,
        json!({"authenticated": true, "user": {"id": 42}}),
    );
    let mut app = app(&backend, Arc::new(MemoryStore::new()));
    app.start().await;
    assert_eq!(app.surface().text(USER_NAME), "ID 42");
    assert!(!app.surface().is_hidden(LOGOUT_BUTTON));

    backend.on_json("GET", "/me", 200, json!({"authenticated": false}));
    backend.on_json("POST", "/logout", 200, json!({}));
    app.logout().await;

    assert_eq!(backend.requests_to("POST", "/logout").len(), 1);
    assert!(app.surface().is_hidden(SCREEN_MAIN));
    assert!(app.surface().is_hidden(USER_NAME));
    assert!(app.surface().is_hidden(LOGOUT_BUTTON));
    assert!(!app.surface().html(LOGIN_CONTAINER).is_empty());

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generate_sends_references_in_row_order() -> TestResult<()> {
    let Some(backend) =
        MockBackend::start_or_skip("generate_sends_references_in_row_order").await?
    else {
        return Ok(());
    };
    local_mode(&backend);
    backend.on_json(
        "POST",
        "/generate",
        200,
        json!({"imageUrl": "/api/images/abc.png", "id": "abc.png"}),
    );
    let mut app = app(&backend, Arc::new(MemoryStore::new()));
    app.start().await;

    app.set_prompt("кот");
    app.set_improved_prompt("  рыжий кот на крыше ");
    app.set_use_improved(true);
    app.set_format("1536x1024");
    let first = app.form().refs.rows()[0].id;
    app.select_reference(first, Some(png("a.png", b"first"))).await;
    let second = app.add_reference_row().ok_or("row not added")?;
    app.select_reference(second, Some(png("b.png", b"second"))).await;

    app.generate().await;

    let sent = backend.requests_to("POST", "/generate");
    assert_eq!(sent.len(), 1);
    let body = sent[0].json().ok_or("generate body is not JSON")?;
    assert_eq!(body["prompt"], json!("рыжий кот на крыше"));
    assert_eq!(body["format"], json!("1536x1024"));
    assert_eq!(
        body["refs"],
        json!([
            "data:image/png;base64,Zmlyc3Q=",
            "data:image/png;base64,c2Vjb25k"
        ])
    );

    let surface = app.surface();
    assert!(surface.alerts().is_empty());
    assert!(surface.is_hidden(LOADING_SECTION));
    assert!(!surface.is_hidden(RESULT_SECTION));
    let src = surface.attr(RESULT_PREVIEW, "src").ok_or("no preview")?;
    assert!(src.starts_with("/api/images/abc.png?t="));
    assert_eq!(surface.attr(DOWNLOAD_BUTTON, "href"), Some("/api/images/abc.png"));
    assert_eq!(surface.attr(DOWNLOAD_BUTTON, "download"), Some("abc.png"));
    assert!(!app.facts().is_running());

    app.retry().await;
    assert_eq!(backend.requests_to("POST", "/generate").len(), 2);
    assert_eq!(app.current_result(), Some("/api/images/abc.png"));

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_reference_clears_row_and_alerts() -> TestResult<()> {
    let Some(backend) =
        MockBackend::start_or_skip("unreadable_reference_clears_row_and_alerts").await?
    else {
        return Ok(());
    };
    local_mode(&backend);
    backend.on_json(
        "POST",
        "/generate",
        200,
        json!({"imageUrl": "/api/images/abc.png", "id": "abc.png"}),
    );
    let mut app = app(&backend, Arc::new(MemoryStore::new()));
    app.start().await;
    app.set_prompt("кот");

    let row = app.form().refs.rows()[0].id;
    app.select_reference(row, Some(png("broken.png", b""))).await;

    assert_eq!(
        app.surface_mut().take_alerts(),
        vec!["Не удалось прочитать файл broken.png".to_string()]
    );
    assert_eq!(app.form().refs.slot(row), Some(&RefSlot::Empty));
    assert_eq!(app.form().refs.previews().live_count(), 0);
    assert!(!app.form().refs.has_any());
    assert!(app.surface().is_hidden(ADD_REF_BUTTON));

    app.generate().await;
    let sent = backend.requests_to("POST", "/generate");
    assert_eq!(sent.len(), 1);
    let body = sent[0].json().ok_or("generate body is not JSON")?;
    assert_eq!(body["refs"], json!([]));
    assert!(app.surface().alerts().is_empty());

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generation_failures_map_to_messages() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("generation_failures_map_to_messages").await?
    else {
        return Ok(());
    };
    local_mode(&backend);
    let mut app = app(&backend, Arc::new(MemoryStore::new()));
    app.start().await;
    app.set_prompt("кот");

    let json_cases = [
        (401, json!({"detail": "Not authenticated"}), AUTH_REQUIRED),
        (422, json!({"detail": "Промпт отклонён модерацией"}), "Промпт отклонён модерацией"),
        (500, json!({"error": "boom"}), GENERATION_FAILED),
    ];
    for (status, body, expected) in json_cases {
        backend.on_json("POST", "/generate", status, body);
        app.generate().await;
        assert_eq!(app.surface_mut().take_alerts(), vec![expected.to_string()]);
        assert!(app.surface().is_hidden(LOADING_SECTION));
        assert!(app.surface().is_hidden(RESULT_SECTION));
    }

    let html_cases = [
        (413, REFS_TOO_LARGE),
        (502, SERVER_ERROR),
        (200, SERVER_ERROR),
    ];
    for (status, expected) in html_cases {
        backend.on_html("POST", "/generate", status, "<html><body>nginx</body></html>");
        app.generate().await;
        assert_eq!(app.surface_mut().take_alerts(), vec![expected.to_string()]);
    }
    assert_eq!(app.current_result(), None);

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_the_latest_generation_renders() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("only_the_latest_generation_renders").await?
    else {
        return Ok(());
    };
    backend.on_json(
        "POST",
        "/generate",
        200,
        json!({"imageUrl": "/api/images/same.png"}),
    );
    let mut app = app(&backend, Arc::new(MemoryStore::new()));
    app.set_prompt("кот");

    let first = app.begin_generation(Instant::now()).ok_or("first not started")?;
    app.set_prompt("собака");
    let second = app.begin_generation(Instant::now()).ok_or("second not started")?;
    assert_eq!(first.prompt(), "кот");
    assert_eq!(second.prompt(), "собака");

    let (first_done, second_done) = tokio::join!(first.send(), second.send());
    assert!(app.finish_generation(second_done));
    assert!(!app.finish_generation(first_done));
    assert_eq!(backend.requests_to("POST", "/generate").len(), 2);
    assert_eq!(app.surface().attr(DOWNLOAD_BUTTON, "download"), Some("image.png"));

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn improve_prompt_fills_panel() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("improve_prompt_fills_panel").await? else {
        return Ok(());
    };
    let storage: Storage = Arc::new(MemoryStore::new());
    let mut app = app(&backend, storage.clone());

    app.improve_prompt().await;
    assert_eq!(
        app.surface_mut().take_alerts(),
        vec![IMPROVE_NEEDS_PROMPT.to_string()]
    );
    assert!(backend.requests_to("POST", "/improve-prompt").is_empty());

    backend.on_json(
        "POST",
        "/improve-prompt",
        200,
        json!({"improved": "  Рыжий кот на крыше, закат  "}),
    );
    app.set_prompt("кот");
    app.improve_prompt().await;
    assert_eq!(app.form().improved_prompt, "Рыжий кот на крыше, закат");
    assert!(!app.surface().is_hidden(IMPROVED_PANEL));
    assert!(!app.surface().is_disabled(IMPROVE_BUTTON));
    let body = backend.requests_to("POST", "/improve-prompt")[0]
        .json()
        .ok_or("improve body is not JSON")?;
    assert_eq!(body, json!({"prompt": "кот"}));
    let stored = Draft::parse(&storage.get(DRAFT_KEY)?.ok_or("draft not stored")?)
        .ok_or("draft unreadable")?;
    assert_eq!(stored.improved_prompt, "Рыжий кот на крыше, закат");

    backend.on_json("POST", "/improve-prompt", 200, json!({"improved": ""}));
    app.improve_prompt().await;
    assert_eq!(app.form().improved_prompt, "кот");

    backend.on_json(
        "POST",
        "/improve-prompt",
        503,
        json!({"detail": "LLM недоступна"}),
    );
    app.improve_prompt().await;
    assert_eq!(app.form().improved_prompt, "");
    assert_eq!(
        app.surface_mut().take_alerts(),
        vec!["Ошибка: LLM недоступна".to_string()]
    );
    assert!(!app.surface().is_disabled(IMPROVE_BUTTON));

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn history_popup_lists_and_copies() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("history_popup_lists_and_copies").await? else {
        return Ok(());
    };
    backend.on_json(
        "GET",
        "/history",
        200,
        json!({"items": [
            {"id": "a.png", "url": "/api/images/a.png", "name": "a.png", "prompt": "кот в сапогах"},
            {"id": "b.png", "url": "/api/images/b.png", "prompt": "   "}
        ]}),
    );
    let clipboard = MemoryClipboard::new();
    let mut app = ImageWebApp::new(
        backend.client(),
        Arc::new(MemoryStore::new()),
        Arc::new(clipboard.clone()),
    );

    app.open_history().await;
    let surface = app.surface();
    assert!(!surface.is_hidden(HISTORY_POPUP));
    assert!(surface.is_hidden(HISTORY_EMPTY));
    let list = surface.html(HISTORY_LIST);
    assert_eq!(list.matches("history-item\"").count(), 2);
    assert_eq!(list.matches("history-copy-prompt-btn").count(), 1);
    assert!(list.contains("download=\"image.png\""));

    assert_eq!(app.copy_history_prompt(0).await, Some(COPIED_LABEL));
    assert_eq!(clipboard.last().as_deref(), Some("кот в сапогах"));
    assert_eq!(app.copy_history_prompt(1).await, None);

    assert!(!app.history_backdrop_click("history-list"));
    assert!(app.history_backdrop_click(HISTORY_POPUP));
    assert!(app.surface().is_hidden(HISTORY_POPUP));

    backend.on_json("GET", "/history", 200, json!({"items": []}));
    app.open_history().await;
    assert!(!app.surface().is_hidden(HISTORY_EMPTY));
    app.close_history();

    backend.on_html("GET", "/history", 500, "oops");
    app.open_history().await;
    assert_eq!(app.surface().text(HISTORY_EMPTY), HISTORY_FAILED);
    assert!(!app.surface().is_hidden(HISTORY_EMPTY));

    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn draft_survives_restart_on_disk() -> TestResult<()> {
    let Some(backend) = MockBackend::start_or_skip("draft_survives_restart_on_disk").await? else {
        return Ok(());
    };
    local_mode(&backend);
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("storage.json");

    {
        let storage: Storage = Arc::new(FileStore::open(&path, 5 * 1024 * 1024)?);
        let mut app = app(&backend, storage);
        app.start().await;
        app.set_prompt("маяк в тумане");
        app.set_format("1024x1536");
    }

    let storage: Storage = Arc::new(FileStore::open(&path, 5 * 1024 * 1024)?);
    let mut app = app(&backend, storage);
    app.start().await;
    assert_eq!(app.form().prompt, "маяк в тумане");
    assert_eq!(app.form().format, "1024x1536");
    assert_eq!(app.form().refs.len(), 1);

    app.new_generation();
    let mut app = self::app(&backend, Arc::new(FileStore::open(&path, 5 * 1024 * 1024)?));
    app.start().await;
    assert_eq!(app.form().prompt, "");
    assert_eq!(app.form().format, "1024x1024");

    backend.shutdown().await;
    Ok(())
}
