//! バックエンドの JSON スキーマとの対応付け
//!
//! バックエンドは `name` / `isCompleted` / `imageUrl` を使う。
//! ここより上のレイヤーはこの名前を知らない。

use domain::{ImageChange, TodoId, TodoItem, TodoPatch};
use serde::{Deserialize, Serialize};

/// アイテムのレスポンス（一覧は id / name / isCompleted のみ）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: TodoId,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

impl From<ItemRecord> for TodoItem {
    fn from(record: ItemRecord) -> Self {
        TodoItem {
            id: record.id,
            title: record.name,
            completed: record.is_completed,
            memo: record.memo.unwrap_or_default(),
            // 空文字は未設定として扱う
            image: record.image_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

/// POST /{tenant}/items
#[derive(Debug, Serialize)]
pub struct CreateItemBody<'a> {
    pub name: &'a str,
}

/// PATCH /{tenant}/items/{id}（指定されたフィールドのみ送る）
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<&'a str>,
    /// `Some(None)` は `imageUrl: null`（画像を外す）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl<'a> From<&'a TodoPatch> for UpdateItemBody<'a> {
    fn from(patch: &'a TodoPatch) -> Self {
        Self {
            name: patch.title.as_deref(),
            memo: patch.memo.as_deref(),
            image_url: patch.image.as_ref().map(ImageChange::url),
            is_completed: patch.completed,
        }
    }
}

/// エラー時・削除時のボディ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_record_maps_to_canonical_item() {
        let record: ItemRecord = serde_json::from_value(json!({
            "id": 12,
            "tenantId": "haqu",
            "name": "Buy milk",
            "memo": "2%",
            "imageUrl": "https://cdn.example.com/milk.png",
            "isCompleted": true
        }))
        .unwrap();

        let item = TodoItem::from(record);
        assert_eq!(item.id, TodoId::from(12));
        assert_eq!(item.title, "Buy milk");
        assert_eq!(item.memo, "2%");
        assert_eq!(item.image.as_deref(), Some("https://cdn.example.com/milk.png"));
        assert!(item.completed);
    }

    #[test]
    fn list_projection_fills_defaults() {
        let record: ItemRecord =
            serde_json::from_value(json!({"id": 3, "name": "Walk", "isCompleted": false})).unwrap();
        let item = TodoItem::from(record);
        assert_eq!(item.memo, "");
        assert!(item.image.is_none());
    }

    #[test]
    fn null_and_empty_fields_are_absent() {
        let record: ItemRecord = serde_json::from_value(json!({
            "id": "5", "name": "Read", "memo": null, "imageUrl": "", "isCompleted": false
        }))
        .unwrap();
        let item = TodoItem::from(record);
        assert_eq!(item.memo, "");
        assert!(item.image.is_none());
    }

    #[test]
    fn update_body_contains_only_supplied_fields() {
        let patch = TodoPatch::completion(true);
        let body = serde_json::to_value(UpdateItemBody::from(&patch)).unwrap();
        assert_eq!(body, json!({"isCompleted": true}));

        let patch = TodoPatch {
            title: Some("Buy milk".into()),
            memo: Some("2%".into()),
            completed: Some(false),
            image: Some(ImageChange::Set("https://cdn.example.com/a.png".into())),
        };
        let body = serde_json::to_value(UpdateItemBody::from(&patch)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "Buy milk",
                "memo": "2%",
                "imageUrl": "https://cdn.example.com/a.png",
                "isCompleted": false
            })
        );
    }

    #[test]
    fn update_body_sends_null_to_clear_image() {
        let patch = TodoPatch {
            image: Some(ImageChange::Clear),
            ..Default::default()
        };
        let body = serde_json::to_value(UpdateItemBody::from(&patch)).unwrap();
        assert_eq!(body, json!({"imageUrl": null}));
    }
}
