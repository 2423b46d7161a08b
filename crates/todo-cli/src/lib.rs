//! `todo` コマンドの引数解析と実行

pub mod args;
pub mod commands;

pub use args::*;
pub use commands::*;
