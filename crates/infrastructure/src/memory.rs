//! 開発・テスト用のインメモリ実装
//!
//! 受け取った呼び出しをすべて記録するので、「通信が発生しなかった」ことを検証できる。

use domain::{ImageUpload, TodoError, TodoId, TodoItem, TodoPatch, UploadedImage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::repositories::{DeleteReceipt, TodoStore};

/// 記録される呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List { page: u32, page_size: u32 },
    Get(TodoId),
    Create(String),
    Update(TodoId, TodoPatch),
    Delete(TodoId),
    Upload { file_name: String, size: usize },
}

/// 失敗を注入する対象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Get,
    Create,
    Update,
    Delete,
    Upload,
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::List { .. } => StoreOp::List,
            StoreCall::Get(_) => StoreOp::Get,
            StoreCall::Create(_) => StoreOp::Create,
            StoreCall::Update(..) => StoreOp::Update,
            StoreCall::Delete(_) => StoreOp::Delete,
            StoreCall::Upload { .. } => StoreOp::Upload,
        }
    }
}

#[derive(Default)]
struct State {
    items: Vec<TodoItem>,
    next_id: u64,
    uploads: u64,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, TodoError>,
    holds: HashMap<StoreOp, Arc<Notify>>,
}

#[derive(Default)]
pub struct InMemoryTodoStore {
    state: Mutex<State>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初期データを投入（記録には残さない）
    pub fn with_items(items: impl IntoIterator<Item = TodoItem>) -> Self {
        let store = Self::default();
        {
            let mut state = store.lock();
            for item in items {
                if let Ok(n) = item.id.as_str().parse::<u64>() {
                    state.next_id = state.next_id.max(n);
                }
                state.items.push(item);
            }
        }
        store
    }

    /// 現在のデータ（バックエンド側の真の状態）
    pub fn items(&self) -> Vec<TodoItem> {
        self.lock().items.clone()
    }

    pub fn item(&self, id: &TodoId) -> Option<TodoItem> {
        self.lock().items.iter().find(|item| &item.id == id).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn calls_of(&self, op: StoreOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// 次の `op` 呼び出しを 1 回だけ失敗させる
    pub fn fail_next(&self, op: StoreOp, error: TodoError) {
        self.lock().failures.insert(op, error);
    }

    /// 次の `op` 呼び出しを、返り値の `Notify` が通知されるまで待たせる
    pub fn hold_next(&self, op: StoreOp) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.lock().holds.insert(op, notify.clone());
        notify
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // テスト中のパニックでロックが汚染されても状態はそのまま使える
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 呼び出しを記録し、保留・失敗注入を処理する
    async fn begin(&self, call: StoreCall) -> Result<(), TodoError> {
        let op = call.op();
        let hold = {
            let mut state = self.lock();
            state.calls.push(call);
            state.holds.remove(&op)
        };

        if let Some(notify) = hold {
            notify.notified().await;
        }

        match self.lock().failures.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn missing(id: &TodoId) -> TodoError {
    TodoError::Fetch {
        status: 404,
        message: format!("item {id} not found"),
    }
}

impl TodoStore for InMemoryTodoStore {
    async fn list_todos(&self, page: u32, page_size: u32) -> Result<Vec<TodoItem>, TodoError> {
        self.begin(StoreCall::List { page, page_size }).await?;

        let state = self.lock();
        let start = (page.max(1) as usize - 1) * page_size as usize;
        Ok(state
            .items
            .iter()
            .skip(start)
            .take(page_size as usize)
            .map(|item| TodoItem::summary(item.id.clone(), item.title.clone(), item.completed))
            .collect())
    }

    async fn get_todo(&self, id: &TodoId) -> Result<TodoItem, TodoError> {
        self.begin(StoreCall::Get(id.clone())).await?;

        self.item(id).ok_or_else(|| TodoError::NotFound(id.to_string()))
    }

    async fn create_todo(&self, title: &str) -> Result<TodoItem, TodoError> {
        self.begin(StoreCall::Create(title.to_string())).await?;

        let mut state = self.lock();
        state.next_id += 1;
        let item = TodoItem::summary(TodoId::from(state.next_id), title, false);
        state.items.push(item.clone());
        Ok(item)
    }

    async fn update_todo(&self, id: &TodoId, patch: &TodoPatch) -> Result<TodoItem, TodoError> {
        self.begin(StoreCall::Update(id.clone(), patch.clone())).await?;

        let mut state = self.lock();
        let item = state
            .items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| missing(id))?;
        patch.apply_to(item);
        Ok(item.clone())
    }

    async fn delete_todo(&self, id: &TodoId) -> Result<DeleteReceipt, TodoError> {
        self.begin(StoreCall::Delete(id.clone())).await?;

        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|item| &item.id != id);
        if state.items.len() == before {
            return Err(missing(id));
        }
        Ok(DeleteReceipt {
            message: Some("Success".to_string()),
        })
    }

    async fn upload_image(&self, upload: &ImageUpload) -> Result<UploadedImage, TodoError> {
        upload.validate()?;
        self.begin(StoreCall::Upload {
            file_name: upload.file_name.clone(),
            size: upload.size(),
        })
        .await?;

        let mut state = self.lock();
        state.uploads += 1;
        Ok(UploadedImage {
            url: format!("memory://images/{}/{}", state.uploads, upload.file_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_applies_patches() {
        let store = InMemoryTodoStore::new();
        let created = store.create_todo("Buy milk").await.unwrap();
        assert_eq!(created.id, TodoId::from(1));

        let updated = store
            .update_todo(&created.id, &TodoPatch::completion(true))
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Buy milk");

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::Create("Buy milk".into()),
                StoreCall::Update(created.id.clone(), TodoPatch::completion(true)),
            ]
        );
    }

    #[tokio::test]
    async fn list_returns_summary_projection() {
        let mut item = TodoItem::summary(TodoId::from(3), "Walk", true);
        item.memo = "park".into();
        let store = InMemoryTodoStore::with_items([item]);

        let listed = store.list_todos(1, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].memo, "");

        let next = store.create_todo("Run").await.unwrap();
        assert_eq!(next.id, TodoId::from(4));
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let store = InMemoryTodoStore::new();
        store.fail_next(StoreOp::List, TodoError::Network("down".into()));

        assert!(store.list_todos(1, 10).await.is_err());
        assert!(store.list_todos(1, 10).await.is_ok());
        assert_eq!(store.calls_of(StoreOp::List), 2);
    }

    #[tokio::test]
    async fn missing_items() {
        let store = InMemoryTodoStore::new();
        let id = TodoId::from(99);
        assert_eq!(store.get_todo(&id).await.unwrap_err(), TodoError::NotFound("99".into()));
        assert!(matches!(
            store.delete_todo(&id).await.unwrap_err(),
            TodoError::Fetch { status: 404, .. }
        ));
    }

    #[tokio::test]
    async fn rejected_upload_is_not_recorded() {
        let store = InMemoryTodoStore::new();
        let upload = ImageUpload::new(vec![0; 8], "café.png", "image/png");
        assert!(store.upload_image(&upload).await.unwrap_err().is_validation());
        assert_eq!(store.call_count(), 0);
    }
}
