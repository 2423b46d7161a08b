//! テスト用のスタブバックエンドとフィクスチャ

pub mod fixtures;
pub mod stub_backend;

pub use fixtures::*;
pub use stub_backend::*;
