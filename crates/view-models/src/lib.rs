//! 一覧・詳細・作成フォームの状態管理
//!
//! 各ビューモデルは `TodoStore` だけに依存し、状態はバックエンドから取り直す。

pub mod detail;
pub mod form;
pub mod list;
pub mod signals;

pub use detail::*;
pub use form::*;
pub use list::*;
pub use signals::*;
