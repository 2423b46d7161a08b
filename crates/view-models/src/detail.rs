use domain::{normalize_title, ImageUpload, TodoError, TodoId, TodoItem, TodoPatch, ValidationError};
use infrastructure::TodoStore;
use shared::{ErrorReport, Operation};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::signals::{ListInvalidation, Navigation, Outcome, ViewEpoch};

/// 詳細画面の読み込み状態
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    NotFound,
    /// ユーザー向けメッセージ
    Error(String),
}

/// 削除の確認が取れたことを表すトークン
///
/// `request_delete()` でのみ発行され、発行時に読み込まれていたアイテムに紐づく。
/// 破棄すれば削除は行われない。
#[derive(Debug, PartialEq, Eq)]
pub struct DeleteConfirmation {
    id: TodoId,
}

impl DeleteConfirmation {
    pub fn id(&self) -> &TodoId {
        &self.id
    }
}

/// 詳細（編集）画面
pub struct TodoDetailViewModel<S> {
    store: Arc<S>,
    invalidation: ListInvalidation,
    draft: Option<TodoItem>,
    /// 最後に読み込み・保存した時点の画像 URL
    saved_image: Option<String>,
    load_state: LoadState,
    error: Option<ErrorReport>,
    epoch: ViewEpoch,
}

impl<S: TodoStore> TodoDetailViewModel<S> {
    pub fn new(store: Arc<S>, invalidation: ListInvalidation) -> Self {
        Self {
            store,
            invalidation,
            draft: None,
            saved_image: None,
            load_state: LoadState::Idle,
            error: None,
            epoch: ViewEpoch::new(),
        }
    }

    /// 編集中の内容
    pub fn draft(&self) -> Option<&TodoItem> {
        self.draft.as_ref()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        self.error.as_ref()
    }

    pub fn epoch(&self) -> ViewEpoch {
        self.epoch.clone()
    }

    /// アイテムを読み込む
    ///
    /// 存在しない場合は `Navigation::ToList` を返す。その他の失敗はエラーとして返す。
    #[instrument(skip(self))]
    pub async fn load(&mut self, id: &TodoId) -> Result<Outcome<Navigation>, TodoError> {
        let ticket = self.epoch.current();
        let previous = std::mem::replace(&mut self.load_state, LoadState::Loading);

        let result = self.store.get_todo(id).await;
        if !self.epoch.is_current(ticket) {
            debug!("Discarding detail response after leaving the view");
            self.load_state = previous;
            return Ok(Outcome::Stale);
        }

        match result {
            Ok(item) => {
                debug!(title = %item.title, "Todo loaded");
                self.saved_image = item.image.clone();
                self.draft = Some(item);
                self.load_state = LoadState::Loaded;
                self.error = None;
                Ok(Outcome::Applied(Navigation::Stay))
            }
            Err(e) => {
                self.draft = None;
                self.saved_image = None;
                let e = self.fail(Operation::Load, e);
                if e.is_not_found() {
                    self.load_state = LoadState::NotFound;
                    return Ok(Outcome::Applied(Navigation::ToList));
                }
                let message = self.error.as_ref().map(|r| r.message.clone()).unwrap_or_default();
                self.load_state = LoadState::Error(message);
                Err(e)
            }
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.title = title.into();
        }
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.memo = memo.into();
        }
    }

    pub fn toggle_completion(&mut self) {
        if let Some(draft) = self.draft.as_mut() {
            draft.completed = !draft.completed;
        }
    }

    /// 画像 URL を直接設定（`None` で画像を外し、保存時に削除として送る）
    pub fn set_image(&mut self, image: Option<String>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.image = image;
        }
    }

    /// 画像を検証してアップロードし、返された URL を下書きに設定する
    ///
    /// 失敗した場合、下書きの画像は変更しない。
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn attach_image(
        &mut self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<Outcome<String>, TodoError> {
        if self.draft.is_none() {
            return Err(self.fail(Operation::Upload, ValidationError::NothingLoaded.into()));
        }

        let upload = ImageUpload::new(bytes, file_name, mime_type);
        if let Err(e) = upload.validate() {
            return Err(self.fail(Operation::Upload, e.into()));
        }

        let ticket = self.epoch.current();
        let result = self.store.upload_image(&upload).await;
        if !self.epoch.is_current(ticket) {
            return Ok(Outcome::Stale);
        }

        let uploaded = result.map_err(|e| self.fail(Operation::Upload, e))?;
        info!(url = %uploaded.url, "Image uploaded");
        self.set_image(Some(uploaded.url.clone()));
        self.error = None;
        Ok(Outcome::Applied(uploaded.url))
    }

    /// 下書きを保存する
    ///
    /// 成功すると一覧の再取得を要求して `Navigation::ToList` を返す。
    /// 失敗しても下書きは元に戻さない。
    #[instrument(skip(self))]
    pub async fn save(&mut self) -> Result<Outcome<Navigation>, TodoError> {
        let Some(draft) = self.draft.as_ref() else {
            return Err(self.fail(Operation::Update, ValidationError::NothingLoaded.into()));
        };
        let id = draft.id.clone();
        let mut patch = TodoPatch::from_draft(draft, self.saved_image.as_deref());

        match normalize_title(&draft.title) {
            Ok(title) => patch.title = Some(title),
            Err(e) => return Err(self.fail(Operation::Update, e.into())),
        }

        let ticket = self.epoch.current();
        let result = self.store.update_todo(&id, &patch).await;
        if result.is_ok() {
            self.invalidation.publish();
        }
        if !self.epoch.is_current(ticket) {
            return Ok(Outcome::Stale);
        }

        let saved = result.map_err(|e| self.fail(Operation::Update, e))?;
        info!(id = %saved.id, "Todo saved");
        self.saved_image = saved.image.clone();
        self.draft = Some(saved);
        self.error = None;
        Ok(Outcome::Applied(Navigation::ToList))
    }

    /// 削除の確認を求める。読み込み済みのアイテムに紐づくトークンを返す
    pub fn request_delete(&mut self) -> Result<DeleteConfirmation, TodoError> {
        match self.draft.as_ref() {
            Some(draft) => Ok(DeleteConfirmation {
                id: draft.id.clone(),
            }),
            None => Err(self.fail(Operation::Delete, ValidationError::NothingLoaded.into())),
        }
    }

    /// 確認済みのアイテムを削除する
    #[instrument(skip(self))]
    pub async fn delete(&mut self, confirmation: DeleteConfirmation) -> Result<Outcome<Navigation>, TodoError> {
        let loaded = self.draft.as_ref().map(|draft| draft.id.clone());
        if loaded.as_ref() != Some(&confirmation.id) {
            return Err(self.fail(Operation::Delete, ValidationError::ConfirmationMismatch.into()));
        }

        let ticket = self.epoch.current();
        let result = self.store.delete_todo(&confirmation.id).await;
        if result.is_ok() {
            self.invalidation.publish();
        }
        if !self.epoch.is_current(ticket) {
            return Ok(Outcome::Stale);
        }

        let receipt = result.map_err(|e| self.fail(Operation::Delete, e))?;
        info!(id = %confirmation.id, message = ?receipt.message, "Todo deleted");
        self.draft = None;
        self.saved_image = None;
        self.load_state = LoadState::Idle;
        self.error = None;
        Ok(Outcome::Applied(Navigation::ToList))
    }

    fn fail(&mut self, operation: Operation, error: TodoError) -> TodoError {
        warn!(operation = operation.as_str(), error = %error, "Todo detail operation failed");
        self.error = Some(ErrorReport::new(operation, &error));
        error
    }
}
