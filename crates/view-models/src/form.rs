use domain::{normalize_title, TodoError, TodoItem, ValidationError};
use infrastructure::TodoStore;
use shared::{ErrorReport, Operation};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::signals::{ListInvalidation, Outcome, ViewEpoch};

/// 入力欄で押されたキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Char(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 空白のみの入力。何も送信していない
    Skipped,
    Created(TodoItem),
}

/// 新規作成フォーム
pub struct CreateFormViewModel<S> {
    store: Arc<S>,
    invalidation: ListInvalidation,
    draft_title: String,
    error: Option<ErrorReport>,
    epoch: ViewEpoch,
}

impl<S: TodoStore> CreateFormViewModel<S> {
    pub fn new(store: Arc<S>, invalidation: ListInvalidation) -> Self {
        Self {
            store,
            invalidation,
            draft_title: String::new(),
            error: None,
            epoch: ViewEpoch::new(),
        }
    }

    pub fn draft_title(&self) -> &str {
        &self.draft_title
    }

    /// 入力内容を書き換える（検証はしない）
    pub fn set_draft_title(&mut self, text: impl Into<String>) {
        self.draft_title = text.into();
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        self.error.as_ref()
    }

    pub fn epoch(&self) -> ViewEpoch {
        self.epoch.clone()
    }

    /// 入力内容で ToDo を作成する
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<Outcome<SubmitOutcome>, TodoError> {
        let title = match normalize_title(&self.draft_title) {
            Ok(title) => title,
            Err(ValidationError::EmptyTitle) => {
                debug!("Skipping submit of blank title");
                return Ok(Outcome::Applied(SubmitOutcome::Skipped));
            }
            Err(e) => return Err(self.fail(e.into())),
        };

        let ticket = self.epoch.current();
        let result = self.store.create_todo(&title).await;
        if result.is_ok() {
            self.invalidation.publish();
        }
        if !self.epoch.is_current(ticket) {
            return Ok(Outcome::Stale);
        }

        let created = result.map_err(|e| self.fail(e))?;
        info!(id = %created.id, "Todo created");
        self.draft_title.clear();
        self.error = None;
        Ok(Outcome::Applied(SubmitOutcome::Created(created)))
    }

    /// キー入力を処理する。Enter は `submit()` と同じ
    pub async fn handle_key(&mut self, key: Key) -> Result<Option<Outcome<SubmitOutcome>>, TodoError> {
        match key {
            Key::Enter => self.submit().await.map(Some),
            _ => Ok(None),
        }
    }

    fn fail(&mut self, error: TodoError) -> TodoError {
        warn!(operation = Operation::Create.as_str(), error = %error, "Todo create failed");
        self.error = Some(ErrorReport::new(Operation::Create, &error));
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::TITLE_MAX_CHARS;
    use infrastructure::{InMemoryTodoStore, StoreCall, StoreOp};

    type FormVm = CreateFormViewModel<InMemoryTodoStore>;

    fn setup() -> (Arc<InMemoryTodoStore>, ListInvalidation, FormVm) {
        let store = Arc::new(InMemoryTodoStore::new());
        let invalidation = ListInvalidation::new();
        let vm = CreateFormViewModel::new(store.clone(), invalidation.clone());
        (store, invalidation, vm)
    }

    #[tokio::test]
    async fn submit_creates_trimmed_title_and_clears_draft() {
        let (store, invalidation, mut vm) = setup();
        vm.set_draft_title("  Buy milk  ");

        let outcome = vm.submit().await.unwrap();
        let Outcome::Applied(SubmitOutcome::Created(item)) = outcome else {
            panic!("expected a created item");
        };
        assert_eq!(item.title, "Buy milk");
        assert!(!item.completed);
        assert_eq!(vm.draft_title(), "");
        assert_eq!(invalidation.version(), 1);
        assert_eq!(store.calls(), vec![StoreCall::Create("Buy milk".into())]);
    }

    #[tokio::test]
    async fn blank_submit_makes_no_call() {
        let (store, invalidation, mut vm) = setup();

        for draft in ["", "   ", "\t\n"] {
            vm.set_draft_title(draft);
            let outcome = vm.submit().await.unwrap();
            assert_eq!(outcome, Outcome::Applied(SubmitOutcome::Skipped));
            assert_eq!(vm.draft_title(), draft);
        }

        assert_eq!(store.call_count(), 0);
        assert_eq!(invalidation.version(), 0);
        assert!(vm.error().is_none());
    }

    #[tokio::test]
    async fn overlong_title_is_rejected_locally() {
        let (store, _invalidation, mut vm) = setup();
        vm.set_draft_title("a".repeat(TITLE_MAX_CHARS + 1));

        let err = vm.submit().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.call_count(), 0);

        vm.set_draft_title("가".repeat(TITLE_MAX_CHARS));
        assert!(vm.submit().await.is_ok());
        assert_eq!(store.calls_of(StoreOp::Create), 1);
    }

    #[tokio::test]
    async fn failed_submit_keeps_draft() {
        let (store, invalidation, mut vm) = setup();
        store.fail_next(StoreOp::Create, TodoError::Network("down".into()));
        vm.set_draft_title("Buy milk");

        assert!(vm.submit().await.is_err());
        assert_eq!(vm.draft_title(), "Buy milk");
        assert_eq!(vm.error().unwrap().message, "할 일을 추가하지 못했습니다.");
        assert_eq!(invalidation.version(), 0);
    }

    #[tokio::test]
    async fn enter_key_submits_and_other_keys_do_nothing() {
        let (store, _invalidation, mut vm) = setup();
        vm.set_draft_title("Buy milk");

        assert_eq!(vm.handle_key(Key::Char('x')).await.unwrap(), None);
        assert_eq!(vm.handle_key(Key::Escape).await.unwrap(), None);
        assert_eq!(store.call_count(), 0);

        let outcome = vm.handle_key(Key::Enter).await.unwrap();
        assert!(matches!(
            outcome,
            Some(Outcome::Applied(SubmitOutcome::Created(_)))
        ));
        assert_eq!(store.calls_of(StoreOp::Create), 1);

        // 空になった入力での Enter は送信しない
        let outcome = vm.handle_key(Key::Enter).await.unwrap();
        assert_eq!(outcome, Some(Outcome::Applied(SubmitOutcome::Skipped)));
        assert_eq!(store.calls_of(StoreOp::Create), 1);
    }

    #[tokio::test]
    async fn submit_response_after_leaving_is_discarded() {
        let (store, invalidation, mut vm) = setup();
        vm.set_draft_title("Buy milk");
        let release = store.hold_next(StoreOp::Create);
        let epoch = vm.epoch();

        let leave = async {
            while store.calls_of(StoreOp::Create) == 0 {
                tokio::task::yield_now().await;
            }
            epoch.leave();
            release.notify_one();
        };
        let (outcome, ()) = tokio::join!(vm.submit(), leave);

        assert!(outcome.unwrap().is_stale());
        assert_eq!(vm.draft_title(), "Buy milk");
        assert_eq!(invalidation.version(), 1);
        assert_eq!(store.items().len(), 1);
        assert!(vm.error().is_none());
    }
}
