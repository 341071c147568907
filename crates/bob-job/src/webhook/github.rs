use super::WebhookError;
use crate::spec::{JobSpec, normalize_git_ref};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;
use sha2::Sha256;

pub const GITHUB_EVENT_HEADER: &str = "x-github-event";

/// `sha256=<hex>`
pub const GITHUB_SIGNATURE_256_HEADER: &str = "x-hub-signature-256";

/// `sha1=<hex>`（旧形式）
pub const GITHUB_SIGNATURE_HEADER: &str = "x-hub-signature";

const SUPPORTED_EVENTS: &[&str] = &["push"];

#[derive(Debug, Deserialize)]
struct Owner {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    owner: Owner,
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    repository: Repository,
    #[serde(rename = "ref")]
    git_ref: String,
}

/// GitHub の push イベントを JobSpec に変換
pub fn github_push(event: Option<&str>, body: &[u8]) -> Result<JobSpec, WebhookError> {
    let event = event.unwrap_or_default();
    if !SUPPORTED_EVENTS.contains(&event) {
        return Err(WebhookError::UnsupportedEvent(format!(
            "GitHub event type '{}' is not supported",
            event
        )));
    }

    let payload: PushPayload =
        serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

    let owner = payload
        .repository
        .owner
        .name
        .filter(|s| !s.is_empty())
        .or(payload.repository.owner.login)
        .unwrap_or_default();

    Ok(JobSpec::new(
        owner,
        payload.repository.name,
        normalize_git_ref(&payload.git_ref),
    ))
}

/// webhook 署名の検証
///
/// `X-Hub-Signature-256` があればそれを、無ければ `X-Hub-Signature` を使う。
/// 比較は定数時間で行う。
pub fn verify_github_signature(
    secret: &str,
    signature_256: Option<&str>,
    signature_sha1: Option<&str>,
    body: &[u8],
) -> bool {
    if let Some(signature) = signature_256 {
        let Some(expected) = decode_signature(signature, "sha256=") else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        return mac.verify_slice(&expected).is_ok();
    }

    if let Some(signature) = signature_sha1 {
        let Some(expected) = decode_signature(signature, "sha1=") else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        return mac.verify_slice(&expected).is_ok();
    }

    false
}

fn decode_signature(signature: &str, prefix: &str) -> Option<Vec<u8>> {
    hex::decode(signature.trim().strip_prefix(prefix)?).ok()
}
