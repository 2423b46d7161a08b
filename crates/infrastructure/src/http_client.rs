use domain::{ImageUpload, TodoError, TodoId, TodoItem, TodoPatch, UploadedImage, ValidationError};
use reqwest::{multipart, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use shared::{Config, Operation};
use tracing::{debug, instrument, warn};

use crate::models::{CreateItemBody, ItemRecord, MessageBody, UpdateItemBody};
use crate::repositories::{DeleteReceipt, TodoStore};

/// reqwest によるリモートストア実装
#[derive(Debug, Clone)]
pub struct HttpTodoStore {
    client: reqwest::Client,
    config: Config,
}

impl HttpTodoStore {
    /// 設定のタイムアウトを適用したクライアントを作成
    pub fn new(config: Config) -> Result<Self, TodoError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TodoError::Network(format!("failed to build http client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `items/{id}` の URL。id は 1 つのパスセグメントとしてエンコードする
    ///
    /// 空・`.`・`..` はどのアイテムも指さないので送信せずに `NotFound` とする。
    fn item_url(&self, id: &TodoId) -> Result<Url, TodoError> {
        let segment = id.to_string();
        if matches!(segment.as_str(), "" | "." | "..") {
            warn!(id = %segment, "rejecting id that is not a path segment");
            return Err(TodoError::NotFound(segment));
        }

        let mut url = Url::parse(&self.config.endpoint("items"))
            .map_err(|e| TodoError::Network(format!("invalid endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| TodoError::Network("endpoint cannot take path segments".into()))?
            .push(&segment);
        Ok(url)
    }

    /// リクエストを 1 回送り、成功時のボディを返す
    ///
    /// `missing` が指定されていれば 404 を `NotFound` に変換する。
    async fn execute(
        &self,
        operation: Operation,
        request: RequestBuilder,
        missing: Option<&TodoId>,
    ) -> Result<Vec<u8>, TodoError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
            return Ok(body.to_vec());
        }

        // エラーボディが読めなくても失敗として扱う
        let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let message = serde_json::from_slice::<MessageBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback_message(operation).to_string());

        warn!(
            operation = operation.as_str(),
            status = status.as_u16(),
            %message,
            "request failed"
        );

        match missing {
            Some(id) if status == StatusCode::NOT_FOUND => Err(TodoError::NotFound(id.to_string())),
            _ => Err(TodoError::Fetch {
                status: status.as_u16(),
                message,
            }),
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> TodoError {
        let mapped = if error.is_timeout() {
            TodoError::Timeout(self.config.request_timeout)
        } else if error.is_decode() {
            TodoError::Decode(error.to_string())
        } else {
            TodoError::Network(error.to_string())
        };
        warn!(error = %mapped, "transport failure");
        mapped
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, TodoError> {
    serde_json::from_slice(body).map_err(|e| TodoError::Decode(e.to_string()))
}

fn fallback_message(operation: Operation) -> &'static str {
    match operation {
        Operation::List => "Failed to fetch todos",
        Operation::Load => "Failed to fetch todo",
        Operation::Create => "Failed to create todo",
        Operation::Update => "Failed to update todo",
        Operation::Delete => "Failed to delete todo",
        Operation::Upload => "Failed to upload image",
    }
}

impl TodoStore for HttpTodoStore {
    #[instrument(skip(self), fields(tenant = %self.config.tenant_id))]
    async fn list_todos(&self, page: u32, page_size: u32) -> Result<Vec<TodoItem>, TodoError> {
        debug!("fetching todo list");
        let request = self
            .client
            .get(self.config.endpoint("items"))
            .query(&[("page", page), ("pageSize", page_size)]);

        let body = self.execute(Operation::List, request, None).await?;
        let records: Vec<ItemRecord> = decode(&body)?;
        debug!(count = records.len(), "todo list fetched");
        Ok(records.into_iter().map(TodoItem::from).collect())
    }

    #[instrument(skip(self), fields(tenant = %self.config.tenant_id, id = %id))]
    async fn get_todo(&self, id: &TodoId) -> Result<TodoItem, TodoError> {
        debug!("fetching todo");
        let request = self.client.get(self.item_url(id)?);
        let body = self.execute(Operation::Load, request, Some(id)).await?;
        let record: ItemRecord = decode(&body)?;
        Ok(record.into())
    }

    #[instrument(skip(self, title), fields(tenant = %self.config.tenant_id))]
    async fn create_todo(&self, title: &str) -> Result<TodoItem, TodoError> {
        debug!("creating todo");
        let request = self
            .client
            .post(self.config.endpoint("items"))
            .json(&CreateItemBody { name: title });

        let body = self.execute(Operation::Create, request, None).await?;
        let record: ItemRecord = decode(&body)?;
        debug!(id = %record.id, "todo created");
        Ok(record.into())
    }

    #[instrument(skip(self, patch), fields(tenant = %self.config.tenant_id, id = %id))]
    async fn update_todo(&self, id: &TodoId, patch: &TodoPatch) -> Result<TodoItem, TodoError> {
        debug!(?patch, "updating todo");
        let request = self
            .client
            .patch(self.item_url(id)?)
            .json(&UpdateItemBody::from(patch));

        let body = self.execute(Operation::Update, request, None).await?;
        let record: ItemRecord = decode(&body)?;
        Ok(record.into())
    }

    #[instrument(skip(self), fields(tenant = %self.config.tenant_id, id = %id))]
    async fn delete_todo(&self, id: &TodoId) -> Result<DeleteReceipt, TodoError> {
        debug!("deleting todo");
        let request = self.client.delete(self.item_url(id)?);
        let body = self.execute(Operation::Delete, request, None).await?;

        // 空ボディも成功として受け付ける
        let message = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            decode::<MessageBody>(&body)?.message
        };
        Ok(DeleteReceipt { message })
    }

    #[instrument(skip(self, upload), fields(tenant = %self.config.tenant_id, file = %upload.file_name, size = upload.size()))]
    async fn upload_image(&self, upload: &ImageUpload) -> Result<UploadedImage, TodoError> {
        upload.validate()?;

        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|_| ValidationError::UnsupportedMediaType(upload.mime_type.clone()))?;
        let form = multipart::Form::new().part("image", part);

        debug!("uploading image");
        let request = self
            .client
            .post(self.config.endpoint("images/upload"))
            .multipart(form);

        let body = self.execute(Operation::Upload, request, None).await?;
        let uploaded: UploadedImage = decode(&body)?;
        debug!(url = %uploaded.url, "image uploaded");
        Ok(uploaded)
    }
}
