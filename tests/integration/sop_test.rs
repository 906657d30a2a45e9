//! Integration tests for the document version lifecycle.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{TestApp, pdf_bytes};

#[tokio::test]
async fn test_full_lifecycle_replace_and_restore() {
    let app = TestApp::new().await;

    let v1 = app.create_active("Press-01", "line-setup.pdf").await;
    let v2 = app.replace_and_commit(&v1, "line-setup-rev2.pdf").await;

    let active = app.request("GET", "/api/sops/list", None).await;
    assert_eq!(active.status, StatusCode::OK);
    let items = active.body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], v2);
    assert_eq!(items[0]["prev_version_id"], v1);
    assert_eq!(items[0]["state"], "ACTIVE");

    let archived = app
        .request("GET", "/api/sops/list?state=archived", None)
        .await;
    let items = archived.body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], v1);

    let restored = app
        .request("POST", &format!("/api/sops/restore/{v2}"), None)
        .await;
    assert_eq!(restored.status, StatusCode::OK, "{}", restored.body);
    assert!(restored.body["success"].as_bool().unwrap());
    assert_eq!(restored.body["data"]["id"], v1);
    assert_eq!(restored.body["data"]["state"], "ACTIVE");

    let gone = app.request("GET", &format!("/api/sops/{v2}"), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn test_sign_upload_returns_pending_ticket() {
    let app = TestApp::new().await;

    let data = app.sign_upload("Lathe-02", "calibration.docx", ".DOCX").await;
    let id = data["version_id"].as_str().unwrap();
    let path = data["storage_path"].as_str().unwrap();
    assert!(path.starts_with("sops/"));
    assert!(path.ends_with("/calibration.docx"));
    assert!(data["upload_url"].as_str().unwrap().contains(path));
    assert!(data["upload_headers"]["Content-Type"]
        .as_str()
        .unwrap()
        .contains("wordprocessingml"));

    let version = app.request("GET", &format!("/api/sops/{id}"), None).await;
    assert_eq!(version.status, StatusCode::OK);
    assert_eq!(version.body["data"]["state"], "PENDING");
    assert_eq!(version.body["data"]["extension"], "docx");
    assert_eq!(version.body["data"]["updated_by"], "operator");

    // Pending versions are not listed as current
    let active = app.request("GET", "/api/sops/list", None).await;
    assert!(active.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_upload_validation() {
    let app = TestApp::new().await;

    let missing = app
        .request(
            "POST",
            "/api/sops/sign-upload",
            Some(json!({
                "machine_name": "",
                "department": "Assembly",
                "filename": "a.pdf",
                "ext": "pdf",
                "uploaded_by": "operator",
            })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["success"], false);
    assert_eq!(missing.body["error"], "VALIDATION_ERROR");

    let bad_ext = app
        .request(
            "POST",
            "/api/sops/sign-upload",
            Some(json!({
                "machine_name": "Press-01",
                "department": "Assembly",
                "filename": "a.exe",
                "ext": "exe",
                "uploaded_by": "operator",
            })),
        )
        .await;
    assert_eq!(bad_ext.status, StatusCode::BAD_REQUEST);

    let bad_id = app.request("GET", "/api/sops/not-a-uuid", None).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_commit_without_upload_is_rejected() {
    let app = TestApp::new().await;
    let data = app.sign_upload("Press-01", "setup.pdf", "pdf").await;
    let id = data["version_id"].as_str().unwrap();

    let response = app.commit(id).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "INTEGRITY_ERROR");
    assert_eq!(response.body["details"]["reason"], "blob_missing");

    // Still pending; a later upload can be committed
    let path = data["storage_path"].as_str().unwrap();
    app.upload(path, pdf_bytes(400), "application/pdf");
    let response = app.commit(id).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["state"], "ACTIVE");
    assert_eq!(response.body["data"]["size_bytes"], 400);
    assert_eq!(response.body["data"]["content_type"], "application/pdf");
}

#[tokio::test]
async fn test_commit_rejects_small_and_mismatched_objects() {
    let app = TestApp::new().await;
    let data = app.sign_upload("Press-01", "setup.pdf", "pdf").await;
    let id = data["version_id"].as_str().unwrap();
    let path = data["storage_path"].as_str().unwrap();

    app.upload(path, pdf_bytes(50), "application/pdf");
    let response = app.commit(id).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["details"]["reason"], "blob_too_small");

    app.upload(path, vec![b'x'; 500], "text/plain");
    let response = app.commit(id).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["details"]["reason"], "content_type_mismatch");
}

#[tokio::test]
async fn test_commit_is_idempotent_and_accepts_file_id() {
    let app = TestApp::new().await;
    let id = app.create_active("Press-01", "setup.pdf").await;

    let again = app
        .request("POST", "/api/sops/commit", Some(json!({ "fileId": id })))
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["data"]["state"], "ACTIVE");

    let unknown = app.commit("6b1f8c1e-0000-4000-8000-000000000000").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_restore_without_history() {
    let app = TestApp::new().await;
    let id = app.create_active("Press-01", "setup.pdf").await;

    let response = app
        .request("POST", &format!("/api/sops/restore/{id}"), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "NO_HISTORY");

    let still = app.request("GET", &format!("/api/sops/{id}"), None).await;
    assert_eq!(still.body["data"]["state"], "ACTIVE");
}

#[tokio::test]
async fn test_replace_requires_active_version() {
    let app = TestApp::new().await;
    let v1 = app.create_active("Press-01", "setup.pdf").await;
    app.replace_and_commit(&v1, "setup-2.pdf").await;

    // v1 is archived now
    let response = app
        .request(
            "POST",
            &format!("/api/sops/replace/{v1}"),
            Some(json!({ "filename": "x.pdf", "ext": "pdf", "uploaded_by": "editor" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let missing = app
        .request(
            "POST",
            "/api/sops/replace/6b1f8c1e-0000-4000-8000-000000000000",
            Some(json!({ "filename": "x.pdf", "ext": "pdf", "uploaded_by": "editor" })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_replace_single_winner() {
    let app = TestApp::new().await;
    let v1 = app.create_active("Press-01", "setup.pdf").await;
    let path = format!("/api/sops/replace/{v1}");
    let body = json!({ "filename": "next.pdf", "ext": "pdf", "uploaded_by": "editor" });

    let (a, b) = tokio::join!(
        app.request("POST", &path, Some(body.clone())),
        app.request("POST", &path, Some(body.clone())),
    );

    let mut statuses = [a.status, b.status];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn test_signed_read() {
    let app = TestApp::new().await;

    let pending = app.sign_upload("Press-01", "setup.pdf", "pdf").await;
    let pending_id = pending["version_id"].as_str().unwrap();
    let response = app
        .request("GET", &format!("/api/sops/signed/{pending_id}"), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let id = app.create_active("Press-02", "torque.pdf").await;
    let response = app
        .request("GET", &format!("/api/sops/signed/{id}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["filename"], "torque.pdf");
    assert!(
        response.body["data"]["download_url"]
            .as_str()
            .unwrap()
            .ends_with("/torque.pdf")
    );
}

#[tokio::test]
async fn test_list_filters_and_history() {
    let app = TestApp::new().await;
    let press = app.create_active("Press-01", "setup.pdf").await;
    app.create_active("Lathe-02", "setup.pdf").await;
    let press_v2 = app.replace_and_commit(&press, "setup-2.pdf").await;
    let press_v3 = app.replace_and_commit(&press_v2, "setup-3.pdf").await;

    let all_active = app.request("GET", "/api/sops/list", None).await;
    assert_eq!(all_active.body["data"].as_array().unwrap().len(), 2);

    let press_only = app
        .request("GET", "/api/sops/list?machine_name=Press-01", None)
        .await;
    let items = press_only.body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], press_v3);

    let bad_state = app
        .request("GET", "/api/sops/list?state=current", None)
        .await;
    assert_eq!(bad_state.status, StatusCode::BAD_REQUEST);

    let history = app
        .request("GET", &format!("/api/sops/{press}/history"), None)
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let ids: Vec<&str> = history.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], press_v3);
    assert!(ids.contains(&press.as_str()));
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["metadata_store"]["backend"], "memory");
    assert_eq!(response.body["data"]["blob_store"]["backend"], "memory");
}
