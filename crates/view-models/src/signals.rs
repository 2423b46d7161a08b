use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// 操作後の画面遷移の指示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// 現在の画面に留まる
    Stay,
    /// 一覧画面へ戻る
    ToList,
}

/// 応答を状態に反映したかどうか
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    /// 画面を離れた後に届いた応答で、破棄した
    Stale,
}

impl<T> Outcome<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Outcome::Stale)
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Stale => None,
        }
    }
}

/// 画面のエポック
///
/// `leave()` でエポックが進み、それより前に開始したリクエストの応答は反映されない。
/// 複製したハンドルからリクエスト中に呼び出せる。
#[derive(Debug, Clone, Default)]
pub struct ViewEpoch(Arc<AtomicU64>);

impl ViewEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// リクエスト開始時に控えておく値
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }

    /// 画面を離れる（進行中の応答はすべて破棄される）
    pub fn leave(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// 一覧の再取得要求
///
/// フォームの作成成功、詳細の保存・削除成功で発行される。
#[derive(Debug, Clone)]
pub struct ListInvalidation {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for ListInvalidation {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }
}

impl ListInvalidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self) {
        self.tx.send_modify(|version| *version += 1);
    }

    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaving_invalidates_earlier_tickets() {
        let epoch = ViewEpoch::new();
        let ticket = epoch.current();
        assert!(epoch.is_current(ticket));

        epoch.clone().leave();
        assert!(!epoch.is_current(ticket));
        assert!(epoch.is_current(epoch.current()));
    }

    #[test]
    fn publish_without_subscribers_still_counts() {
        let invalidation = ListInvalidation::new();
        invalidation.publish();
        invalidation.publish();
        assert_eq!(invalidation.version(), 2);

        let rx = invalidation.subscribe();
        assert_eq!(*rx.borrow(), 2);
    }
}
