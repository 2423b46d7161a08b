use chrono::{DateTime, Utc};
use domain::{TodoError, ValidationError, MAX_IMAGE_BYTES, TITLE_MAX_CHARS};
use serde::Serialize;

/// 失敗した操作の種類（ユーザー向けメッセージの出し分けに使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Load,
    Create,
    Update,
    Delete,
    Upload,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Load => "load",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Upload => "upload",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Operation::List => "할 일 목록을 불러오지 못했습니다.",
            Operation::Load => "할 일을 불러오지 못했습니다.",
            Operation::Create => "할 일을 추가하지 못했습니다.",
            Operation::Update => "저장에 실패했습니다.",
            Operation::Delete => "삭제에 실패했습니다.",
            Operation::Upload => "이미지 업로드에 실패했습니다.",
        }
    }
}

/// エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 入力不正（通信前に検出）
    Validation,
    /// 対象が存在しない
    NotFound,
    /// 通信・バックエンド側の失敗
    Network,
}

/// エラーの重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

/// 画面に表示するエラー情報
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// エラーコード
    pub code: &'static str,
    pub operation: Operation,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    /// ユーザー向けメッセージ
    pub message: String,
    /// 技術的な詳細（ログ用）
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(operation: Operation, error: &TodoError) -> Self {
        let (code, category, severity) = classify(error);

        Self {
            code,
            operation,
            category,
            severity,
            message: user_message(operation, error),
            detail: error.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn classify(error: &TodoError) -> (&'static str, ErrorCategory, ErrorSeverity) {
    match error {
        TodoError::Validation(_) => ("VALIDATION_ERROR", ErrorCategory::Validation, ErrorSeverity::Info),
        TodoError::NotFound(_) => ("NOT_FOUND", ErrorCategory::NotFound, ErrorSeverity::Info),
        TodoError::Fetch { .. } => ("FETCH_ERROR", ErrorCategory::Network, ErrorSeverity::Error),
        TodoError::Network(_) => ("NETWORK_ERROR", ErrorCategory::Network, ErrorSeverity::Error),
        TodoError::Timeout(_) => ("TIMEOUT", ErrorCategory::Network, ErrorSeverity::Warning),
        TodoError::Decode(_) => ("DECODE_ERROR", ErrorCategory::Network, ErrorSeverity::Error),
    }
}

/// ユーザー向けメッセージを取得
///
/// バックエンドが `message` を返した場合はそれを優先する。
pub fn user_message(operation: Operation, error: &TodoError) -> String {
    match error {
        TodoError::Validation(v) => validation_message(operation, v),
        TodoError::NotFound(_) => "할 일을 찾을 수 없습니다.".to_string(),
        TodoError::Fetch { message, .. } if !message.is_empty() => message.clone(),
        TodoError::Timeout(_) => "응답 시간이 초과되었습니다. 잠시 후 다시 시도해 주세요.".to_string(),
        _ => operation.failure_message().to_string(),
    }
}

fn validation_message(operation: Operation, error: &ValidationError) -> String {
    match error {
        ValidationError::EmptyTitle => "할 일을 입력해 주세요.".to_string(),
        ValidationError::TitleTooLong { .. } => {
            format!("할 일은 {TITLE_MAX_CHARS}자 이하로 입력해 주세요.")
        }
        ValidationError::InvalidFileName(_) => "파일 이름은 영문만 가능합니다.".to_string(),
        ValidationError::FileTooLarge { .. } => {
            format!("파일 크기는 {}MB 이하만 가능합니다.", MAX_IMAGE_BYTES / (1024 * 1024))
        }
        ValidationError::UnsupportedMediaType(_) => "이미지 파일만 업로드할 수 있습니다.".to_string(),
        ValidationError::ConfirmationMismatch => "삭제할 할 일이 선택되지 않았습니다.".to_string(),
        ValidationError::NothingLoaded => match operation {
            Operation::Update => "저장할 할 일이 선택되지 않았습니다.",
            Operation::Upload => "이미지를 첨부할 할 일이 선택되지 않았습니다.",
            Operation::Delete => "삭제할 할 일이 선택되지 않았습니다.",
            Operation::List | Operation::Load | Operation::Create => "선택된 할 일이 없습니다.",
        }
        .to_string(),
    }
}
