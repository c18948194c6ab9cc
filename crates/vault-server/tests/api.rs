use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use vault_core::{AutoSaveConfig, EventBus, InMemoryDrive, MemStore, Mirror, NoteService};
use vault_server::{AppState, router};

fn app_with(mirror: Mirror) -> Router {
    let service = NoteService::new(
        Arc::new(MemStore::with_demo_data().unwrap()),
        mirror,
        Arc::new(EventBus::new()),
    );
    router(Arc::new(AppState {
        service,
        autosave: AutoSaveConfig::default(),
    }))
}

fn app() -> Router {
    app_with(Mirror::disabled())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn lists_demo_vault() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/vaults", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Demo Vault");
    assert_eq!(body[0]["folderId"], "demo-folder-id");
    assert_eq!(body[0]["isConnected"], false);
}

#[tokio::test]
async fn settings_expose_autosave_delay() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autosaveDelayMs"], 1000);
    assert_eq!(body["driveConnected"], false);
}

#[tokio::test]
async fn vault_create_and_update() {
    let app = app();

    let (status, body) = send(&app, "POST", "/api/vaults", Some(json!({ "name": 5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid vault data");

    let (status, vault) = send(
        &app,
        "POST",
        "/api/vaults",
        Some(json!({ "name": "Work", "folderId": "work-folder" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vault["id"], 2);
    assert_eq!(vault["isConnected"], false);
    assert!(vault["lastSync"].is_string());

    let (status, vault) = send(
        &app,
        "PUT",
        "/api/vaults/2",
        Some(json!({ "name": "Work notes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vault["name"], "Work notes");
    assert_eq!(vault["folderId"], "work-folder");

    let (status, body) = send(&app, "PUT", "/api/vaults/99", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Vault not found");
}

#[tokio::test]
async fn tree_nests_and_filters() {
    let app = app();
    let (status, tree) = send(&app, "GET", "/api/vaults/1/tree", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree[0]["name"], "Notes");
    assert_eq!(tree[0]["isFolder"], true);
    assert_eq!(tree[0]["children"][0]["name"], "Daily Note.md");
    assert!(tree[0].get("content").is_none());

    let (_, hits) = send(&app, "GET", "/api/vaults/1/tree?q=WELCOME", None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["path"], "/Welcome.md");

    let (status, _) = send(&app, "GET", "/api/vaults/7/tree", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resolves_links() {
    let app = app();
    let (status, file) = send(
        &app,
        "GET",
        "/api/vaults/1/resolve?target=Daily%20Note",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(file["path"], "/Notes/Daily Note.md");

    let (status, _) = send(&app, "GET", "/api/vaults/1/resolve?target=Nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn file_lifecycle() {
    let app = app();

    let (status, note) = send(
        &app,
        "POST",
        "/api/notes",
        Some(json!({ "vaultId": 1, "parentId": 3, "title": "Ideas", "content": "See [[Welcome]]" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["path"], "/Notes/Ideas.md");
    let id = note["id"].as_u64().unwrap();

    let (status, preview) = send(&app, "GET", &format!("/api/files/{id}/preview"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["markdown"], "See [Welcome](wikilink:Welcome)");
    assert!(
        preview["html"]
            .as_str()
            .unwrap()
            .contains("class=\"wikilink\" data-target=\"Welcome\"")
    );

    let (status, stats) = send(&app, "GET", &format!("/api/files/{id}/stats"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["bytes"], 15);
    assert_eq!(stats["size"], "15 Bytes");
    assert_eq!(stats["slug"], "ideas");
    assert_eq!(stats["words"], 2);

    let (status, _) = send(&app, "GET", "/api/files/999/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/files/{id}"),
        Some(json!({ "content": "rewritten" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "rewritten");
    assert_eq!(updated["name"], "Ideas.md");

    let (status, body) = send(&app, "DELETE", &format!("/api/files/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File deleted successfully");

    let (status, body) = send(&app, "GET", &format!("/api/files/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "File not found");

    let (status, _) = send(&app, "DELETE", &format!("/api/files/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn file_create_enforces_store_rules() {
    let app = app();

    let (status, body) = send(&app, "POST", "/api/files", Some(json!({ "name": "A.md" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid file data");

    let (status, _) = send(
        &app,
        "POST",
        "/api/files",
        Some(json!({ "vaultId": 1, "name": "Welcome.md", "path": "/Welcome.md" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Welcome.md (id 1) is not a folder
    let (status, _) = send(
        &app,
        "POST",
        "/api/files",
        Some(json!({ "vaultId": 1, "name": "B.md", "path": "/Welcome.md/B.md", "parentId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Notes (id 3) cannot move under its own child
    let (status, _) = send(&app, "PUT", "/api/files/3", Some(json!({ "parentId": 4 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_folder_removes_children() {
    let app = app();
    let (status, _) = send(&app, "DELETE", "/api/files/3", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, files) = send(&app, "GET", "/api/vaults/1/files", None).await;
    let paths: Vec<_> = files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["/Welcome.md", "/Another Note.md"]);
}

#[tokio::test]
async fn drive_endpoints_need_a_drive() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/drive/folders", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "No drive connected");

    let (status, _) = send(&app, "POST", "/api/vaults/1/sync", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn drive_browse_import_and_sync() {
    let drive = Arc::new(InMemoryDrive::new());
    let folder = drive.add_folder("Research");
    let remote = drive.add_file(&folder.id, "Paper.md", "# Paper\n\nCites [[Notes]]");
    let app = app_with(Mirror::new(drive.clone()));

    let (status, folders) = send(&app, "GET", "/api/drive/folders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(folders[0]["name"], "Research");

    let (status, files) = send(&app, "GET", &format!("/api/drive/files/{}", folder.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(files[0]["name"], "Paper.md");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/drive/file/{}/content", remote.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "# Paper\n\nCites [[Notes]]");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/drive/file/{}/content", remote.id),
        Some(json!({ "content": "edited remotely" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(drive.content(&remote.id).as_deref(), Some("edited remotely"));

    let (status, report) = send(
        &app,
        "POST",
        "/api/drive/import",
        Some(json!({ "folderId": folder.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["vault"]["name"], "Research");
    assert_eq!(report["imported"], 1);
    let vault_id = report["vault"]["id"].as_u64().unwrap();

    // A note created in the connected vault is published, then synced
    let (_, note) = send(
        &app,
        "POST",
        "/api/notes",
        Some(json!({ "vaultId": vault_id, "title": "Summary" })),
    )
    .await;
    assert!(note["driveFileId"].is_string());

    let (status, report) = send(&app, "POST", &format!("/api/vaults/{vault_id}/sync"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["pushed"], 2);
    assert_eq!(report["imported"], 0);
    assert_eq!(report["vault"]["isConnected"], true);

    let (status, _) = send(&app, "GET", "/api/drive/file/missing/content", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_escapes_markup_in_notes() {
    let app = app();
    let (_, note) = send(
        &app,
        "POST",
        "/api/notes",
        Some(json!({ "vaultId": 1, "title": "Shared", "content": "<script>alert(1)</script> [[A|<b>bold</b>]]" })),
    )
    .await;
    let id = note["id"].as_u64().unwrap();

    let (status, preview) = send(&app, "GET", &format!("/api/files/{id}/preview"), None).await;
    assert_eq!(status, StatusCode::OK);
    let html = preview["html"].as_str().unwrap();
    assert!(!html.contains("<script>"), "{html}");
    assert!(!html.contains("<b>"), "{html}");
    assert!(html.contains("&lt;script&gt;"), "{html}");
}
