use std::time::Duration;
use thiserror::Error;

/// ネットワークに出る前にクライアント側で弾いた入力
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title is too long: {actual} characters (max {max})")]
    TitleTooLong { max: usize, actual: usize },

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("delete confirmation does not match the loaded item")]
    ConfirmationMismatch,

    #[error("no item is loaded")]
    NothingLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Todo not found: {0}")]
    NotFound(String),

    /// 成功以外のステータス。`message` はバックエンドの `message` があればそれを使う
    #[error("Fetch failed ({status}): {message}")]
    Fetch { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl TodoError {
    pub fn is_validation(&self) -> bool {
        matches!(self, TodoError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TodoError::NotFound(_))
    }

    /// 通信に起因する失敗（検証エラー・未検出以外）
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            TodoError::Fetch { .. }
                | TodoError::Network(_)
                | TodoError::Timeout(_)
                | TodoError::Decode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_disjoint() {
        let validation = TodoError::from(ValidationError::EmptyTitle);
        assert!(validation.is_validation());
        assert!(!validation.is_network_failure());

        let missing = TodoError::NotFound("3".into());
        assert!(missing.is_not_found());
        assert!(!missing.is_network_failure());

        for err in [
            TodoError::Fetch { status: 500, message: "boom".into() },
            TodoError::Network("connection refused".into()),
            TodoError::Timeout(Duration::from_secs(30)),
            TodoError::Decode("expected value".into()),
        ] {
            assert!(err.is_network_failure(), "{err}");
            assert!(!err.is_validation());
        }
    }

    #[test]
    fn fetch_error_displays_backend_message() {
        let err = TodoError::Fetch { status: 400, message: "name is required".into() };
        assert_eq!(err.to_string(), "Fetch failed (400): name is required");
    }
}
