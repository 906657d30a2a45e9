//! Integration tests for the local blob store's signed endpoints.

mod helpers;

use axum::http::{StatusCode, header};
use chrono::Utc;

use helpers::{TestApp, local_path, pdf_bytes};
use sophub_core::traits::HttpMethod;
use sophub_storage::UrlSigner;

#[tokio::test]
async fn test_upload_commit_and_download_through_signed_urls() {
    let app = TestApp::with_local_blobs().await;

    let ticket = app.sign_upload("Press-01", "line setup.pdf", "pdf").await;
    let id = ticket["version_id"].as_str().unwrap();
    let upload_url = ticket["upload_url"].as_str().unwrap();
    let content_type = ticket["upload_headers"]["Content-Type"].as_str().unwrap();
    assert!(upload_url.starts_with(helpers::PUBLIC_BASE_URL));
    assert!(upload_url.contains("line%20setup.pdf"));

    let body = pdf_bytes(2048);
    let put = app
        .raw("PUT", local_path(upload_url), Some(content_type), body.clone())
        .await;
    assert_eq!(put.status, StatusCode::OK);

    let committed = app.commit(id).await;
    assert_eq!(committed.status, StatusCode::OK, "{}", committed.body);
    assert_eq!(committed.body["data"]["content_type"], "application/pdf");
    assert_eq!(committed.body["data"]["size_bytes"], 2048);

    let signed = app
        .request("GET", &format!("/api/sops/signed/{id}"), None)
        .await;
    assert_eq!(signed.status, StatusCode::OK);
    let download_url = signed.body["data"]["download_url"].as_str().unwrap();

    let get = app
        .raw("GET", local_path(download_url), None, Vec::new())
        .await;
    assert_eq!(get.status, StatusCode::OK);
    assert_eq!(get.body.as_ref(), body.as_slice());
    assert_eq!(get.headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        get.headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"line setup.pdf\""
    );
}

#[tokio::test]
async fn test_write_url_cannot_replace_committed_bytes() {
    let app = TestApp::with_local_blobs().await;

    let ticket = app.sign_upload("Press-01", "setup.pdf", "pdf").await;
    let id = ticket["version_id"].as_str().unwrap();
    let upload_url = local_path(ticket["upload_url"].as_str().unwrap());

    let body = pdf_bytes(2048);
    let put = app
        .raw("PUT", upload_url, Some("application/pdf"), body.clone())
        .await;
    assert_eq!(put.status, StatusCode::OK);
    let committed = app.commit(id).await;
    assert_eq!(committed.status, StatusCode::OK, "{}", committed.body);

    let again = app
        .raw("PUT", upload_url, Some("application/pdf"), b"bad".to_vec())
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let signed = app
        .request("GET", &format!("/api/sops/signed/{id}"), None)
        .await;
    let download_url = signed.body["data"]["download_url"].as_str().unwrap();
    let get = app
        .raw("GET", local_path(download_url), None, Vec::new())
        .await;
    assert_eq!(get.status, StatusCode::OK);
    assert_eq!(get.body.len(), 2048);
    assert_eq!(get.body.as_ref(), body.as_slice());
}

#[tokio::test]
async fn test_tampered_signature_is_forbidden() {
    let app = TestApp::with_local_blobs().await;
    let ticket = app.sign_upload("Press-01", "setup.pdf", "pdf").await;
    let upload_url = local_path(ticket["upload_url"].as_str().unwrap());

    let (base, _) = upload_url.split_once("&signature=").unwrap();
    let forged = format!("{base}&signature=AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    let put = app
        .raw("PUT", &forged, Some("application/pdf"), pdf_bytes(512))
        .await;
    assert_eq!(put.status, StatusCode::FORBIDDEN);

    // The signature covers the content type
    let put = app
        .raw("PUT", upload_url, Some("text/plain"), pdf_bytes(512))
        .await;
    assert_eq!(put.status, StatusCode::FORBIDDEN);

    // A write URL cannot be used to read
    let get = app.raw("GET", upload_url, None, Vec::new()).await;
    assert_eq!(get.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_expired_url_is_forbidden() {
    let app = TestApp::with_local_blobs().await;
    let ticket = app.sign_upload("Press-01", "setup.pdf", "pdf").await;
    let key = ticket["storage_path"].as_str().unwrap();

    let signer = UrlSigner::new(&app.config.storage.local.signing_secret).unwrap();
    let expires = Utc::now().timestamp() - 60;
    let signature = signer
        .sign(HttpMethod::Put, key, expires, "application/pdf")
        .unwrap();

    let uri = format!("/api/blobs/{key}?expires={expires}&signature={signature}");
    let put = app
        .raw("PUT", &uri, Some("application/pdf"), pdf_bytes(512))
        .await;
    assert_eq!(put.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_blob_routes_disabled_without_local_store() {
    let app = TestApp::new().await;
    let get = app
        .raw(
            "GET",
            "/api/blobs/sops/x/setup.pdf?expires=0&signature=abc",
            None,
            Vec::new(),
        )
        .await;
    assert_eq!(get.status, StatusCode::NOT_FOUND);
}
