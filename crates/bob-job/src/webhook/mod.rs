//! Webhook ペイロード → JobSpec 変換
//!
//! 変換に失敗したペイロードはジョブを作らずに境界で拒否します。

pub mod github;
pub mod travis;

pub use github::{
    GITHUB_EVENT_HEADER, GITHUB_SIGNATURE_256_HEADER, GITHUB_SIGNATURE_HEADER, github_push,
    verify_github_signature,
};
pub use travis::{TRAVIS_PAYLOAD_FIELD, TRAVIS_SLUG_HEADER, travis_authorization, travis_build};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("not building: {0}")]
    Conflict(String),
}
