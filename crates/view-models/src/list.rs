use domain::{Tab, TodoError, TodoId, TodoItem, TodoPatch};
use infrastructure::TodoStore;
use shared::{ErrorReport, Operation};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::signals::{ListInvalidation, Outcome, ViewEpoch};

/// タブが空のときに表示する文言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyState {
    pub message: &'static str,
    pub hint: &'static str,
}

impl EmptyState {
    pub fn for_tab(tab: Tab) -> Self {
        match tab {
            Tab::Todo => Self {
                message: "할 일이 없어요.",
                hint: "TODO를 새롭게 추가해주세요!",
            },
            Tab::Done => Self {
                message: "아직 다 한 일이 없어요.",
                hint: "해야 할 일을 체크해보세요!",
            },
        }
    }
}

/// 未完了・完了に振り分ける。各タブ内の順序は元の順序のまま
pub fn split_by_tab(items: &[TodoItem]) -> (Vec<&TodoItem>, Vec<&TodoItem>) {
    items.iter().partition(|item| item.tab() == Tab::Todo)
}

/// 一覧画面
pub struct TodoListViewModel<S> {
    store: Arc<S>,
    page_size: u32,
    items: Vec<TodoItem>,
    error: Option<ErrorReport>,
    epoch: ViewEpoch,
    invalidations: watch::Receiver<u64>,
    /// 最後に成功した再取得の時点での無効化バージョン
    seen_version: Option<u64>,
}

impl<S: TodoStore> TodoListViewModel<S> {
    pub fn new(store: Arc<S>, invalidation: &ListInvalidation, page_size: u32) -> Self {
        Self {
            store,
            page_size,
            items: Vec::new(),
            error: None,
            epoch: ViewEpoch::new(),
            invalidations: invalidation.subscribe(),
            seen_version: None,
        }
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// 未完了タブの内容
    pub fn pending(&self) -> Vec<&TodoItem> {
        split_by_tab(&self.items).0
    }

    /// 完了タブの内容
    pub fn done(&self) -> Vec<&TodoItem> {
        split_by_tab(&self.items).1
    }

    pub fn tab(&self, tab: Tab) -> Vec<&TodoItem> {
        match tab {
            Tab::Todo => self.pending(),
            Tab::Done => self.done(),
        }
    }

    pub fn pending_is_empty(&self) -> bool {
        !self.items.iter().any(|item| !item.completed)
    }

    pub fn done_is_empty(&self) -> bool {
        !self.items.iter().any(|item| item.completed)
    }

    /// タブが空なら表示する文言を返す
    pub fn empty_state(&self, tab: Tab) -> Option<EmptyState> {
        let empty = match tab {
            Tab::Todo => self.pending_is_empty(),
            Tab::Done => self.done_is_empty(),
        };
        empty.then(|| EmptyState::for_tab(tab))
    }

    /// 他の画面で変更があり、再取得が必要か
    pub fn needs_refresh(&self) -> bool {
        self.seen_version != Some(*self.invalidations.borrow())
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        self.error.as_ref()
    }

    /// リクエスト中に画面を離れるためのハンドル
    pub fn epoch(&self) -> ViewEpoch {
        self.epoch.clone()
    }

    /// 一覧を取得し直して丸ごと置き換える。失敗時は現在の内容を残す
    #[instrument(skip(self), fields(page_size = self.page_size))]
    pub async fn refresh(&mut self) -> Result<Outcome<()>, TodoError> {
        let ticket = self.epoch.current();
        let version = *self.invalidations.borrow();
        debug!("Refreshing todo list");

        let result = self.store.list_todos(1, self.page_size).await;
        if !self.epoch.is_current(ticket) {
            debug!("Discarding list response after leaving the view");
            return Ok(Outcome::Stale);
        }

        match result {
            Ok(items) => {
                debug!(count = items.len(), "Todo list refreshed");
                self.items = items;
                self.error = None;
                self.seen_version = Some(version);
                Ok(Outcome::Applied(()))
            }
            Err(e) => Err(self.fail(Operation::List, e)),
        }
    }

    /// 完了状態を反転して保存し、一覧を取得し直す
    ///
    /// ローカルの状態は先に書き換えない。
    #[instrument(skip(self))]
    pub async fn toggle_completion(&mut self, id: &TodoId) -> Result<Outcome<TodoItem>, TodoError> {
        let current = self.items.iter().find(|item| &item.id == id).map(|item| item.completed);
        let Some(completed) = current else {
            return Err(self.fail(Operation::Update, TodoError::NotFound(id.to_string())));
        };
        let patch = TodoPatch::completion(!completed);

        let ticket = self.epoch.current();
        let result = self.store.update_todo(id, &patch).await;
        if !self.epoch.is_current(ticket) {
            return Ok(Outcome::Stale);
        }

        let updated = result.map_err(|e| self.fail(Operation::Update, e))?;
        match self.refresh().await? {
            Outcome::Applied(()) => Ok(Outcome::Applied(updated)),
            Outcome::Stale => Ok(Outcome::Stale),
        }
    }

    fn fail(&mut self, operation: Operation, error: TodoError) -> TodoError {
        warn!(operation = operation.as_str(), error = %error, "Todo list operation failed");
        self.error = Some(ErrorReport::new(operation, &error));
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::{InMemoryTodoStore, StoreCall, StoreOp};
    use proptest::prelude::*;

    fn item(id: u64, title: &str, completed: bool) -> TodoItem {
        TodoItem::summary(TodoId::from(id), title, completed)
    }

    type ListVm = TodoListViewModel<InMemoryTodoStore>;

    fn setup(items: Vec<TodoItem>) -> (Arc<InMemoryTodoStore>, ListInvalidation, ListVm) {
        let store = Arc::new(InMemoryTodoStore::with_items(items));
        let invalidation = ListInvalidation::new();
        let vm = TodoListViewModel::new(store.clone(), &invalidation, 10);
        (store, invalidation, vm)
    }

    #[tokio::test]
    async fn refresh_splits_items_into_tabs() {
        let (store, _invalidation, mut vm) = setup(vec![
            item(1, "Buy milk", false),
            item(2, "Walk the dog", true),
            item(3, "Read", false),
        ]);

        assert_eq!(vm.refresh().await.unwrap(), Outcome::Applied(()));

        let pending: Vec<_> = vm.pending().iter().map(|i| i.title.as_str()).collect();
        let done: Vec<_> = vm.done().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(pending, vec!["Buy milk", "Read"]);
        assert_eq!(done, vec!["Walk the dog"]);
        assert_eq!(store.calls(), vec![StoreCall::List { page: 1, page_size: 10 }]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_items_and_records_error() {
        let (store, _invalidation, mut vm) = setup(vec![item(1, "Buy milk", false)]);
        vm.refresh().await.unwrap();

        store.fail_next(StoreOp::List, TodoError::Network("connection refused".into()));
        let err = vm.refresh().await.unwrap_err();

        assert!(err.is_network_failure());
        assert_eq!(vm.items().len(), 1);
        let report = vm.error().unwrap();
        assert_eq!(report.operation, Operation::List);
        assert_eq!(report.code, "NETWORK_ERROR");
    }

    #[tokio::test]
    async fn toggle_moves_item_to_other_tab() {
        let (store, _invalidation, mut vm) = setup(vec![item(1, "Buy milk", false)]);
        vm.refresh().await.unwrap();

        let updated = vm.toggle_completion(&TodoId::from(1)).await.unwrap();
        assert!(updated.applied().unwrap().completed);
        assert!(vm.pending().is_empty());
        assert_eq!(vm.done().len(), 1);

        let ops: Vec<_> = store.calls().iter().map(StoreCall::op).collect();
        assert_eq!(ops, vec![StoreOp::List, StoreOp::Update, StoreOp::List]);
    }

    #[tokio::test]
    async fn toggle_is_not_optimistic() {
        let (store, _invalidation, mut vm) = setup(vec![item(1, "Buy milk", false)]);
        vm.refresh().await.unwrap();

        store.fail_next(StoreOp::Update, TodoError::Network("down".into()));
        assert!(vm.toggle_completion(&TodoId::from(1)).await.is_err());

        assert_eq!(vm.pending().len(), 1);
        assert_eq!(vm.error().unwrap().operation, Operation::Update);
        assert!(!store.item(&TodoId::from(1)).unwrap().completed);
    }

    #[tokio::test]
    async fn toggle_of_unknown_item_makes_no_call() {
        let (store, _invalidation, mut vm) = setup(vec![]);
        vm.refresh().await.unwrap();

        let err = vm.toggle_completion(&TodoId::from(9)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.calls_of(StoreOp::Update), 0);
    }

    #[tokio::test]
    async fn empty_tabs_have_messages() {
        let (_store, _invalidation, mut vm) = setup(vec![item(1, "Buy milk", false)]);
        vm.refresh().await.unwrap();

        assert!(vm.empty_state(Tab::Todo).is_none());
        assert_eq!(vm.empty_state(Tab::Done), Some(EmptyState::for_tab(Tab::Done)));
        assert!(vm.done_is_empty());
        assert!(!vm.pending_is_empty());
    }

    #[tokio::test]
    async fn invalidation_marks_list_for_refresh() {
        let (_store, invalidation, mut vm) = setup(vec![]);
        assert!(vm.needs_refresh());

        vm.refresh().await.unwrap();
        assert!(!vm.needs_refresh());

        invalidation.publish();
        assert!(vm.needs_refresh());

        vm.refresh().await.unwrap();
        assert!(!vm.needs_refresh());
    }

    #[tokio::test]
    async fn response_after_leaving_is_discarded() {
        let (store, _invalidation, mut vm) = setup(vec![item(1, "Buy milk", false)]);
        let release = store.hold_next(StoreOp::List);
        let epoch = vm.epoch();

        let leave = async {
            while store.calls_of(StoreOp::List) == 0 {
                tokio::task::yield_now().await;
            }
            epoch.leave();
            release.notify_one();
        };
        let (outcome, ()) = tokio::join!(vm.refresh(), leave);

        assert!(outcome.unwrap().is_stale());
        assert!(vm.items().is_empty());
        assert!(vm.needs_refresh());
    }

    proptest! {
        #[test]
        fn tabs_partition_items(flags in proptest::collection::vec(any::<bool>(), 0..40)) {
            let items: Vec<TodoItem> = flags
                .iter()
                .enumerate()
                .map(|(i, done)| item(i as u64, &format!("item {i}"), *done))
                .collect();

            let (pending, done) = split_by_tab(&items);

            prop_assert_eq!(pending.len() + done.len(), items.len());
            prop_assert!(pending.iter().all(|i| !i.completed));
            prop_assert!(done.iter().all(|i| i.completed));
            prop_assert!(pending.iter().all(|p| !done.iter().any(|d| d.id == p.id)));

            // 各タブ内で元の順序を保つ
            let order = |tab: &[&TodoItem]| {
                tab.iter()
                    .map(|i| i.id.as_str().parse::<usize>().unwrap())
                    .collect::<Vec<_>>()
            };
            let pending_order = order(&pending);
            let done_order = order(&done);
            prop_assert!(pending_order.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(done_order.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
