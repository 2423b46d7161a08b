use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::errors::ValidationError;

/// タイトルの最大文字数（入力欄の maxLength と同じ）
pub const TITLE_MAX_CHARS: usize = 50;

/// バックエンドが採番する ToDo の識別子
///
/// バックエンドは整数で返すが、文字列でも受け付ける。
/// リクエストパスにはそのまま埋め込む。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for TodoId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TodoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TodoId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => TodoId::from(n),
            RawId::Text(s) => TodoId(s),
        })
    }
}

/// クライアント内部で扱う ToDo の正規形
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub title: String,
    pub completed: bool,
    pub memo: String,
    pub image: Option<String>,
}

impl TodoItem {
    /// 一覧 API の射影（id / タイトル / 完了フラグのみ）から生成
    pub fn summary(id: TodoId, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id,
            title: title.into(),
            completed,
            memo: String::new(),
            image: None,
        }
    }

    pub fn tab(&self) -> Tab {
        Tab::of(self.completed)
    }
}

/// 一覧画面のタブ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    /// 未完了
    Todo,
    /// 完了
    Done,
}

impl Tab {
    pub fn of(completed: bool) -> Self {
        if completed {
            Tab::Done
        } else {
            Tab::Todo
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Todo => "TODO",
            Tab::Done => "DONE",
        }
    }
}

/// 画像の変更内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Set(String),
    /// 保存済みの画像を外す（`imageUrl: null` として送る）
    Clear,
}

impl ImageChange {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageChange::Set(url) => Some(url),
            ImageChange::Clear => None,
        }
    }
}

/// 部分更新の内容。`None` のフィールドは送信しない
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub memo: Option<String>,
    pub completed: Option<bool>,
    pub image: Option<ImageChange>,
}

impl TodoPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// 編集可能な全フィールドを下書きから組み立てる。
    /// 画像は下書きにあれば送り、保存済みの画像が外されていれば `Clear` にする
    pub fn from_draft(draft: &TodoItem, saved_image: Option<&str>) -> Self {
        let image = match (&draft.image, saved_image) {
            (Some(url), _) => Some(ImageChange::Set(url.clone())),
            (None, Some(_)) => Some(ImageChange::Clear),
            (None, None) => None,
        };
        Self {
            title: Some(draft.title.clone()),
            memo: Some(draft.memo.clone()),
            completed: Some(draft.completed),
            image,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.memo.is_none() && self.completed.is_none() && self.image.is_none()
    }

    /// 既存のアイテムに適用した結果を返す（インメモリストア用）
    pub fn apply_to(&self, item: &mut TodoItem) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(memo) = &self.memo {
            item.memo = memo.clone();
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
        if let Some(image) = &self.image {
            item.image = image.url().map(str::to_string);
        }
    }
}

/// タイトルを検証し、前後の空白を除いた値を返す
pub fn normalize_title(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let chars = trimmed.chars().count();
    if chars > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
            actual: chars,
        });
    }

    Ok(trimmed.to_string())
}
