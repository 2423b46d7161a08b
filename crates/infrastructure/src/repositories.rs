use domain::{ImageUpload, TodoError, TodoId, TodoItem, TodoPatch, UploadedImage};
use std::future::Future;

/// 削除 API の応答
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReceipt {
    /// バックエンドが返したメッセージ（あれば）
    pub message: Option<String>,
}

/// リモートの ToDo ストアへのアクセス
///
/// 各操作はちょうど 1 回の呼び出しで、リトライ・キャッシュ・バッチ化は行わない。
pub trait TodoStore: Send + Sync {
    /// 一覧を取得（バックエンドの返した順序のまま）
    fn list_todos(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<TodoItem>, TodoError>> + Send;

    /// 1 件取得。存在しない場合は `TodoError::NotFound`
    fn get_todo(&self, id: &TodoId) -> impl Future<Output = Result<TodoItem, TodoError>> + Send;

    /// 作成。タイトルの検証は呼び出し側の責務
    fn create_todo(&self, title: &str) -> impl Future<Output = Result<TodoItem, TodoError>> + Send;

    /// 部分更新。`None` のフィールドは変更しない
    fn update_todo(
        &self,
        id: &TodoId,
        patch: &TodoPatch,
    ) -> impl Future<Output = Result<TodoItem, TodoError>> + Send;

    fn delete_todo(&self, id: &TodoId) -> impl Future<Output = Result<DeleteReceipt, TodoError>> + Send;

    /// 画像をアップロード。検証に失敗した場合は通信しない
    fn upload_image(
        &self,
        upload: &ImageUpload,
    ) -> impl Future<Output = Result<UploadedImage, TodoError>> + Send;
}
