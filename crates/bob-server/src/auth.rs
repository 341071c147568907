//! 認証ミドルウェア

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bob_config::BasicAuth;
use bob_job::webhook::{
    GITHUB_SIGNATURE_256_HEADER, GITHUB_SIGNATURE_HEADER, TRAVIS_SLUG_HEADER,
    travis_authorization, verify_github_signature,
};

/// 署名検証のために読み込む webhook ボディの上限
pub const WEBHOOK_BODY_LIMIT: usize = 2 * 1024 * 1024;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `Authorization: Basic ...` の検証
pub fn check_basic(headers: &HeaderMap, expected: &BasicAuth) -> bool {
    let Some(encoded) = header_str(headers, header::AUTHORIZATION.as_str())
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    match credentials.split_once(':') {
        Some((username, password)) => {
            username == expected.username && password == expected.password
        }
        None => false,
    }
}

/// Travis の `Authorization` ヘッダー（hex(sha256(slug + token))）の検証
pub fn check_travis(headers: &HeaderMap, token: &str) -> bool {
    let (Some(slug), Some(authorization)) = (
        header_str(headers, TRAVIS_SLUG_HEADER),
        header_str(headers, header::AUTHORIZATION.as_str()),
    ) else {
        return false;
    };
    authorization == travis_authorization(slug, token)
}

/// ユーザー名とパスワードの両方が設定されている場合のみ有効
pub async fn basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = &state.config.basic_auth
        && !check_basic(request.headers(), expected)
    {
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

/// Travis トークンが設定されている場合のみ有効
pub async fn travis_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(token) = state.config.travis_token.as_deref().filter(|t| !t.is_empty())
        && !check_travis(request.headers(), token)
    {
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

/// GitHub の `X-Hub-Signature-256` / `X-Hub-Signature` の検証
pub fn check_github(headers: &HeaderMap, secret: &str, body: &[u8]) -> bool {
    verify_github_signature(
        secret,
        header_str(headers, GITHUB_SIGNATURE_256_HEADER),
        header_str(headers, GITHUB_SIGNATURE_HEADER),
        body,
    )
}

/// GitHub シークレットが設定されている場合のみ有効
///
/// 検証後、読み込んだボディをそのままハンドラーへ渡す。
pub async fn github_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(secret) = state.config.github_secret() else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, WEBHOOK_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read GitHub webhook body");
            return ApiError::BadRequest(e.to_string()).into_response();
        }
    };

    if !check_github(&parts.headers, secret, &bytes) {
        tracing::warn!("Rejected GitHub webhook with invalid signature");
        return ApiError::Unauthorized.into_response();
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn credentials() -> BasicAuth {
        BasicAuth {
            username: "bob".into(),
            password: "builder".into(),
        }
    }

    #[test]
    fn test_check_basic() {
        let mut headers = HeaderMap::new();
        assert!(!check_basic(&headers, &credentials()));

        let good = format!("Basic {}", STANDARD.encode("bob:builder"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&good).unwrap());
        assert!(check_basic(&headers, &credentials()));

        let bad = format!("Basic {}", STANDARD.encode("bob:wrong"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&bad).unwrap());
        assert!(!check_basic(&headers, &credentials()));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(!check_basic(&headers, &credentials()));
    }

    #[test]
    fn test_check_travis() {
        let mut headers = HeaderMap::new();
        headers.insert(TRAVIS_SLUG_HEADER, HeaderValue::from_static("rafecolton/bob"));
        assert!(!check_travis(&headers, "s3cret"));

        let digest = travis_authorization("rafecolton/bob", "s3cret");
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&digest).unwrap());
        assert!(check_travis(&headers, "s3cret"));
        assert!(!check_travis(&headers, "other"));
    }

    #[test]
    fn test_check_github_requires_signature_header() {
        let mut headers = HeaderMap::new();
        assert!(!check_github(&headers, "s3cret", b"{}"));

        // 形式が不正な署名
        headers.insert(
            GITHUB_SIGNATURE_256_HEADER,
            HeaderValue::from_static("md5=abcd"),
        );
        assert!(!check_github(&headers, "s3cret", b"{}"));
    }
}
