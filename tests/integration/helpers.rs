//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bytes::Bytes;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use sophub_api::{AppState, build_app};
use sophub_core::config::{AppConfig, BlobProvider};
use sophub_database::MemoryVersionStore;
use sophub_storage::{ConfiguredBlobStore, LocalBlobStore, MemoryBlobStore};

/// Base URL the local blob store signs URLs against in tests.
pub const PUBLIC_BASE_URL: &str = "http://sophub.test";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// In-memory blob store, when the app runs on one
    pub blobs: MemoryBlobStore,
    /// Application config
    pub config: AppConfig,
    _blob_dir: Option<TempDir>,
}

impl TestApp {
    /// App over in-memory metadata and blob stores. Uploads are simulated
    /// with [`TestApp::upload`].
    pub async fn new() -> Self {
        let config = AppConfig::default();
        let blobs = MemoryBlobStore::new();
        let configured = ConfiguredBlobStore {
            store: Arc::new(blobs.clone()),
            local: None,
        };
        let state = AppState::new(
            config.clone(),
            Arc::new(MemoryVersionStore::new()),
            configured,
        );

        Self {
            router: build_app(state),
            blobs,
            config,
            _blob_dir: None,
        }
    }

    /// App whose blobs live on disk and are uploaded through the signed
    /// `/api/blobs` endpoints.
    pub async fn with_local_blobs() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = AppConfig::default();
        config.storage.provider = BlobProvider::Local;
        config.storage.local.root_path = dir.path().to_string_lossy().into_owned();
        config.storage.local.public_base_url = PUBLIC_BASE_URL.to_string();
        config.storage.local.signing_secret = "integration-secret".to_string();

        let local = Arc::new(
            LocalBlobStore::new(&config.storage.local)
                .await
                .expect("Failed to init local blob store"),
        );
        let configured = ConfiguredBlobStore {
            store: local.clone(),
            local: Some(local),
        };
        let state = AppState::new(
            config.clone(),
            Arc::new(MemoryVersionStore::new()),
            configured,
        );

        Self {
            router: build_app(state),
            blobs: MemoryBlobStore::new(),
            config,
            _blob_dir: Some(dir),
        }
    }

    /// Send a JSON request and parse the JSON response
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let raw = self.send(req).await;
        let body: Value = serde_json::from_slice(&raw.body).unwrap_or(Value::Null);
        TestResponse {
            status: raw.status,
            body,
        }
    }

    /// Send a request with a raw body and return the raw response
    pub async fn raw(
        &self,
        method: &str,
        uri: &str,
        content_type: Option<&str>,
        body: impl Into<Bytes>,
    ) -> RawResponse {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            req = req.header(header::CONTENT_TYPE, ct);
        }
        let req = req
            .body(Body::from(body.into()))
            .expect("Failed to build request");
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body");

        RawResponse {
            status,
            headers,
            body,
        }
    }

    /// Initiate an upload for a new document and return the response data
    pub async fn sign_upload(&self, machine: &str, filename: &str, ext: &str) -> Value {
        let response = self
            .request(
                "POST",
                "/api/sops/sign-upload",
                Some(json!({
                    "machine_name": machine,
                    "department": "Assembly",
                    "filename": filename,
                    "ext": ext,
                    "uploaded_by": "operator",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["data"].clone()
    }

    /// Place bytes in the memory blob store, as a client would through the
    /// pre-signed URL.
    pub fn upload(&self, storage_path: &str, data: Vec<u8>, content_type: &str) {
        self.blobs.put(storage_path, data, Some(content_type));
    }

    /// Commit a version
    pub async fn commit(&self, version_id: &str) -> TestResponse {
        self.request(
            "POST",
            "/api/sops/commit",
            Some(json!({ "version_id": version_id })),
        )
        .await
    }

    /// Sign, upload and commit a new document; returns the version id
    pub async fn create_active(&self, machine: &str, filename: &str) -> String {
        let data = self.sign_upload(machine, filename, "pdf").await;
        let id = data["version_id"].as_str().expect("version_id").to_string();
        let path = data["storage_path"].as_str().expect("storage_path");
        self.upload(path, pdf_bytes(512), "application/pdf");

        let committed = self.commit(&id).await;
        assert_eq!(committed.status, StatusCode::OK, "{}", committed.body);
        id
    }

    /// Replace an active version, upload and commit the replacement; returns
    /// the new version id
    pub async fn replace_and_commit(&self, active_id: &str, filename: &str) -> String {
        let response = self
            .request(
                "POST",
                &format!("/api/sops/replace/{active_id}"),
                Some(json!({
                    "filename": filename,
                    "ext": "pdf",
                    "uploaded_by": "editor",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        let data = &response.body["data"];
        let id = data["new_version_id"].as_str().expect("new_version_id").to_string();
        let path = data["storage_path"].as_str().expect("storage_path");
        self.upload(path, pdf_bytes(1024), "application/pdf");

        let committed = self.commit(&id).await;
        assert_eq!(committed.status, StatusCode::OK, "{}", committed.body);
        id
    }
}

/// A PDF-looking payload of `len` bytes
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.resize(len, b'0');
    data
}

/// Strip the public base URL so a signed URL can be sent to the router
pub fn local_path(url: &str) -> &str {
    url.strip_prefix(PUBLIC_BASE_URL).unwrap_or(url)
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Unparsed response
#[derive(Debug)]
pub struct RawResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: axum::http::HeaderMap,
    /// Body bytes
    pub body: Bytes,
}
