//! axum によるバックエンドのスタブ
//!
//! `127.0.0.1:0` で起動し、受けたリクエストをすべて記録する。
//! 失敗・遅延を注入して、クライアント側のエラー処理を検証できる。

use axum::{
    extract::{DefaultBodyLimit, Multipart, OriginalUri, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::Config;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// アップロードを受け付けるボディサイズの上限（5 MiB + マルチパートのオーバーヘッド）
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// 記録されたリクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

/// 記録されたマルチパートのフィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

/// スタブが保持するアイテム（バックエンドのスキーマのまま）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubItem {
    pub id: u64,
    pub name: String,
    pub memo: String,
    pub image_url: Option<String>,
    pub is_completed: bool,
}

impl StubItem {
    fn detail_json(&self, tenant: &str) -> Value {
        json!({
            "id": self.id,
            "tenantId": tenant,
            "name": self.name,
            "memo": self.memo,
            "imageUrl": self.image_url,
            "isCompleted": self.is_completed,
        })
    }

    fn summary_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "isCompleted": self.is_completed,
        })
    }
}

struct Failure {
    status: StatusCode,
    message: Option<String>,
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        match self.message {
            Some(message) => (self.status, Json(json!({ "message": message }))).into_response(),
            None => (self.status, "stub failure").into_response(),
        }
    }
}

#[derive(Default)]
struct Inner {
    items: Vec<StubItem>,
    next_id: u64,
    requests: Vec<RecordedRequest>,
    uploads: Vec<RecordedUpload>,
    failure: Option<Failure>,
    delay: Option<Duration>,
}

#[derive(Clone)]
struct StubState {
    tenant: Arc<str>,
    inner: Arc<Mutex<Inner>>,
}

impl StubState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 記録・遅延・失敗注入・テナント確認をまとめて行う
    async fn enter(&self, request: RecordedRequest, tenant: &str) -> Result<(), Response> {
        let delay = {
            let mut inner = self.lock();
            inner.requests.push(request);
            inner.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.lock().failure.take();
        if let Some(failure) = failure {
            return Err(failure.into_response());
        }

        if tenant != &*self.tenant {
            return Err(not_found("tenant not found"));
        }
        Ok(())
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
}

fn record(method: &Method, uri: &OriginalUri, body: Option<Value>) -> RecordedRequest {
    RecordedRequest {
        method: method.to_string(),
        path: uri.0.path().to_string(),
        query: uri.0.query().map(str::to_string),
        body,
    }
}

/// 起動中のスタブバックエンド。ドロップ時に停止する
pub struct StubBackend {
    addr: SocketAddr,
    state: StubState,
    server: JoinHandle<()>,
}

impl StubBackend {
    pub async fn start(tenant: &str) -> Self {
        let state = StubState {
            tenant: Arc::from(tenant),
            inner: Arc::new(Mutex::new(Inner::default())),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind stub backend");
        let addr = listener.local_addr().expect("stub backend has no local address");

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "stub backend stopped");
            }
        });

        Self { addr, state, server }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// このスタブを指す設定
    pub fn config(&self) -> Config {
        Config::new(&self.base_url(), &self.state.tenant).expect("stub base url is valid")
    }

    /// アイテムを直接追加して id を返す（記録には残さない）
    pub fn seed(&self, name: &str, completed: bool) -> u64 {
        let mut inner = self.state.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.items.push(StubItem {
            id,
            name: name.to_string(),
            memo: String::new(),
            image_url: None,
            is_completed: completed,
        });
        id
    }

    pub fn item(&self, id: u64) -> Option<StubItem> {
        self.state.lock().items.iter().find(|item| item.id == id).cloned()
    }

    pub fn items(&self) -> Vec<StubItem> {
        self.state.lock().items.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().uploads.clone()
    }

    /// 次のリクエストを指定ステータスで失敗させる（`message` が `None` なら非 JSON ボディ）
    pub fn fail_next(&self, status: u16, message: Option<&str>) {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.state.lock().failure = Some(Failure {
            status,
            message: message.map(str::to_string),
        });
    }

    /// 以降のすべてのリクエストに遅延を入れる
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: StubState) -> Router {
    let api = Router::new()
        .route("/:tenant/items", get(list_items).post(create_item))
        .route(
            "/:tenant/items/:id",
            get(get_item).patch(patch_item).delete(delete_item),
        )
        .route("/:tenant/images/upload", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    Router::new().nest("/api", api)
}

async fn list_items(
    method: Method,
    uri: OriginalUri,
    State(state): State<StubState>,
    Path(tenant): Path<String>,
) -> Response {
    if let Err(response) = state.enter(record(&method, &uri, None), &tenant).await {
        return response;
    }

    let mut page = 1usize;
    let mut page_size = 10usize;
    for pair in uri.0.query().unwrap_or_default().split('&') {
        match pair.split_once('=') {
            Some(("page", v)) => page = v.parse().unwrap_or(1),
            Some(("pageSize", v)) => page_size = v.parse().unwrap_or(10),
            _ => {}
        }
    }

    let inner = state.lock();
    let body: Vec<Value> = inner
        .items
        .iter()
        .skip(page.saturating_sub(1) * page_size)
        .take(page_size)
        .map(StubItem::summary_json)
        .collect();
    Json(body).into_response()
}

async fn get_item(
    method: Method,
    uri: OriginalUri,
    State(state): State<StubState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Response {
    if let Err(response) = state.enter(record(&method, &uri, None), &tenant).await {
        return response;
    }

    let inner = state.lock();
    match find(&inner.items, &id) {
        Some(item) => Json(item.detail_json(&tenant)).into_response(),
        None => not_found("item not found"),
    }
}

async fn create_item(
    method: Method,
    uri: OriginalUri,
    State(state): State<StubState>,
    Path(tenant): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = state.enter(record(&method, &uri, Some(body.clone())), &tenant).await {
        return response;
    }

    let name = match body.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "message": "name is required" })))
                .into_response()
        }
    };

    let mut inner = state.lock();
    inner.next_id += 1;
    let item = StubItem {
        id: inner.next_id,
        name,
        memo: String::new(),
        image_url: None,
        is_completed: false,
    };
    inner.items.push(item.clone());
    (StatusCode::CREATED, Json(item.detail_json(&tenant))).into_response()
}

async fn patch_item(
    method: Method,
    uri: OriginalUri,
    State(state): State<StubState>,
    Path((tenant, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = state.enter(record(&method, &uri, Some(body.clone())), &tenant).await {
        return response;
    }

    let mut inner = state.lock();
    let Some(item) = inner.items.iter_mut().find(|item| item.id.to_string() == id) else {
        return not_found("item not found");
    };

    if let Some(name) = body.get("name").and_then(Value::as_str) {
        item.name = name.to_string();
    }
    if let Some(memo) = body.get("memo").and_then(Value::as_str) {
        item.memo = memo.to_string();
    }
    if let Some(image_url) = body.get("imageUrl") {
        item.image_url = image_url.as_str().map(str::to_string);
    }
    if let Some(done) = body.get("isCompleted").and_then(Value::as_bool) {
        item.is_completed = done;
    }
    Json(item.detail_json(&tenant)).into_response()
}

async fn delete_item(
    method: Method,
    uri: OriginalUri,
    State(state): State<StubState>,
    Path((tenant, id)): Path<(String, String)>,
) -> Response {
    if let Err(response) = state.enter(record(&method, &uri, None), &tenant).await {
        return response;
    }

    let mut inner = state.lock();
    let before = inner.items.len();
    inner.items.retain(|item| item.id.to_string() != id);
    if inner.items.len() == before {
        return not_found("item not found");
    }
    Json(json!({ "message": "Success" })).into_response()
}

async fn upload_image(
    method: Method,
    uri: OriginalUri,
    State(state): State<StubState>,
    Path(tenant): Path<String>,
    mut multipart: Multipart,
) -> Response {
    if let Err(response) = state.enter(record(&method, &uri, None), &tenant).await {
        return response;
    }

    let mut url = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": e.to_string() })))
                    .into_response()
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let size = match field.bytes().await {
            Ok(bytes) => bytes.len(),
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": e.to_string() })))
                    .into_response()
            }
        };

        if name == "image" {
            url = Some(format!(
                "https://stub-images.local/{tenant}/{}",
                file_name.as_deref().unwrap_or("upload")
            ));
        }

        state.lock().uploads.push(RecordedUpload {
            field: name,
            file_name,
            content_type,
            size,
        });
    }

    match url {
        Some(url) => Json(json!({ "url": url })).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "image field is required" })),
        )
            .into_response(),
    }
}

fn find<'a>(items: &'a [StubItem], id: &str) -> Option<&'a StubItem> {
    items.iter().find(|item| item.id.to_string() == id)
}
