use super::WebhookError;
use crate::spec::JobSpec;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// フォームの中で JSON を運ぶフィールド
pub const TRAVIS_PAYLOAD_FIELD: &str = "payload";

/// Travis が送る `owner/repo`
pub const TRAVIS_SLUG_HEADER: &str = "travis-repo-slug";

const STATUS_SUCCESS: i64 = 0;
const BUILD_TYPE_PULL_REQUEST: &str = "pull_request";

#[derive(Debug, Deserialize)]
struct Repository {
    owner_name: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Payload {
    repository: Repository,
    commit: String,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default, rename = "type")]
    build_type: Option<String>,
}

/// Travis CI の完了通知を JobSpec に変換
///
/// 成功したビルドかつプルリクエスト以外のみ受け付けます。
pub fn travis_build(payload: &str) -> Result<JobSpec, WebhookError> {
    let payload: Payload =
        serde_json::from_str(payload).map_err(|e| WebhookError::Malformed(e.to_string()))?;
    let slug = format!(
        "{}/{}",
        payload.repository.owner_name, payload.repository.name
    );

    if payload.status != Some(STATUS_SUCCESS) {
        tracing::warn!(repo = %slug, status = ?payload.status, "Travis build was not a success, not building");
        return Err(WebhookError::Conflict(format!(
            "travis build for {} was not a success",
            slug
        )));
    }

    if payload.build_type.as_deref() == Some(BUILD_TYPE_PULL_REQUEST) {
        tracing::warn!(repo = %slug, "Build type is a pull request, not building");
        return Err(WebhookError::Conflict(format!(
            "travis build for {} is a pull request",
            slug
        )));
    }

    Ok(JobSpec::new(
        payload.repository.owner_name,
        payload.repository.name,
        payload.commit,
    ))
}

/// 期待される Authorization ヘッダー値: hex(sha256(slug + token))
pub fn travis_authorization(slug: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(slug.as_bytes());
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(status: &str, build_type: &str) -> String {
        format!(
            r#"{{"repository":{{"owner_name":"rafecolton","name":"bob"}},"commit":"b1a7f8d","status":{},"type":"{}"}}"#,
            status, build_type
        )
    }

    #[test]
    fn test_successful_push_build() {
        let spec = travis_build(&payload("0", "push")).unwrap();
        assert_eq!(spec.account, "rafecolton");
        assert_eq!(spec.repo, "bob");
        assert_eq!(spec.git_ref, "b1a7f8d");
    }

    #[test]
    fn test_failed_build_is_conflict() {
        let err = travis_build(&payload("1", "push")).unwrap_err();
        assert!(matches!(err, WebhookError::Conflict(_)));

        let err = travis_build(&payload("null", "push")).unwrap_err();
        assert!(matches!(err, WebhookError::Conflict(_)));
    }

    #[test]
    fn test_pull_request_is_conflict() {
        let err = travis_build(&payload("0", "pull_request")).unwrap_err();
        assert!(matches!(err, WebhookError::Conflict(_)));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            travis_build("").unwrap_err(),
            WebhookError::Malformed(_)
        ));
        assert!(matches!(
            travis_build(r#"{"repository":{}}"#).unwrap_err(),
            WebhookError::Malformed(_)
        ));
    }

    #[test]
    fn test_authorization_digest() {
        let digest = travis_authorization("rafecolton/bob", "s3cret");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, travis_authorization("rafecolton/bob", "s3cret"));
        assert_ne!(digest, travis_authorization("rafecolton/bob", "other"));
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
