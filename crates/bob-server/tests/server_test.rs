//! HTTP ルーターの統合テスト
//!
//! 実際の git / docker の代わりにフィクスチャを書き出す取得処理と
//! 記録するだけのエンジンを使います。

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine as _;
use bob_build::{ContainerEngine, OutputSink, OutputStream};
use bob_config::{BasicAuth, ServerConfig};
use bob_core::{CommandKind, EngineCommand};
use bob_job::webhook::travis_authorization;
use bob_job::{JobContext, JobError, JobRegistry, JobRunner, JobSpec, SourceFetcher};
use bob_server::{AppState, router};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;

const BOBFILE: &str = r#"
version = 1
[[container]]
name = "app"
tags = ["latest"]
"#;

struct FixtureFetcher;

#[async_trait]
impl SourceFetcher for FixtureFetcher {
    async fn fetch(&self, _spec: &JobSpec, dest: &Path) -> bob_job::Result<()> {
        let write = |name: &str, content: &str| {
            std::fs::write(dest.join(name), content).map_err(|e| JobError::Fetch(e.to_string()))
        };
        std::fs::create_dir_all(dest).map_err(|e| JobError::Fetch(e.to_string()))?;
        write("Bobfile", BOBFILE)?;
        write("Dockerfile", "FROM alpine")?;
        Ok(())
    }
}

#[derive(Default)]
struct FakeEngine {
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn run(
        &self,
        command: &EngineCommand,
        _workdir: &Path,
        sink: &dyn OutputSink,
    ) -> bob_build::Result<()> {
        if let Some(gate) = &self.gate
            && command.kind() == Some(CommandKind::Build)
        {
            gate.notified().await;
        }
        sink.line(OutputStream::Stdout, &command.to_string());
        Ok(())
    }

    async fn latest_image_tagged_with(&self, _build_id: &str) -> bob_build::Result<String> {
        Ok("sha256:feedface".to_string())
    }
}

fn app_with(config: ServerConfig, engine: FakeEngine) -> (Router, JobRegistry) {
    let registry = JobRegistry::new();
    let runner = JobRunner::new(
        registry.clone(),
        JobContext {
            fetcher: Arc::new(FixtureFetcher),
            engine: Arc::new(engine),
            skip_push: true,
        },
    );
    (router(AppState::new(runner, config)), registry)
}

fn app() -> (Router, JobRegistry) {
    app_with(ServerConfig::default(), FakeEngine::default())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"200 OK");
}

#[tokio::test]
async fn test_sync_build_returns_created_after_completion() {
    let (app, _) = app();
    let response = app
        .oneshot(post_json(
            "/docker-build",
            r#"{"account":"o","repo":"x","ref":"main","sync":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "succeeded");
    assert_eq!(json["images"][0]["image_id"], "sha256:feedface");
}

#[tokio::test]
async fn test_async_build_returns_accepted_before_completion() {
    let gate = Arc::new(Notify::new());
    let (app, registry) = app_with(
        ServerConfig::default(),
        FakeEngine {
            gate: Some(gate.clone()),
        },
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/docker-build",
            r#"{"account":"o","repo":"x","ref":"main"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "accepted");
    let id = json["id"].as_str().unwrap().to_string();

    // ビルドはまだ終わっていない
    let job = registry.get(&id.parse().unwrap()).unwrap();
    assert!(!job.status().is_terminal());

    gate.notify_one();
    for _ in 0..200 {
        if job.status().is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = app.oneshot(get(&format!("/jobs/{}", id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "succeeded");
}

#[tokio::test]
async fn test_server_default_sync_mode() {
    let config = ServerConfig {
        sync_by_default: true,
        ..Default::default()
    };
    let (app, _) = app_with(config, FakeEngine::default());
    let response = app
        .oneshot(post_json(
            "/jobs",
            r#"{"account":"o","repo":"x","ref":"main"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_spec_is_precondition_failed() {
    let (app, registry) = app();
    let response = app
        .oneshot(post_json(
            "/docker-build",
            r#"{"account":"","repo":"x","ref":"y"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _) = app();
    let response = app
        .oneshot(post_json("/docker-build", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_failure_is_expectation_failed() {
    let (app, _) = app();
    let response = app
        .oneshot(post_json(
            "/docker-build",
            r#"{"account":"o","repo":"x","ref":"main","sync":true,"bobfile":"missing/Bobfile"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::EXPECTATION_FAILED);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("not openable"));
}

#[tokio::test]
async fn test_github_push() {
    let (app, _) = app();
    let body = r#"{"ref":"refs/heads/master","repository":{"name":"bob","owner":{"name":"rafecolton"}}}"#;

    let request = Request::builder()
        .method("POST")
        .uri("/docker-build/github")
        .header("X-GitHub-Event", "push")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["ref"], "master");

    let request = Request::builder()
        .method("POST")
        .uri("/docker-build/github")
        .header("X-GitHub-Event", "issues")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn signed_github_request(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/docker-build/github")
        .header("X-GitHub-Event", "push")
        .header("X-Hub-Signature-256", signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn github_signature(secret: &str, body: &str) -> String {
    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[tokio::test]
async fn test_github_signature_auth() {
    let config = ServerConfig {
        github_secret: Some("s3cret".into()),
        // シークレット設定時は Basic 認証を要求しない
        basic_auth: Some(BasicAuth {
            username: "bob".into(),
            password: "builder".into(),
        }),
        ..Default::default()
    };
    let (app, registry) = app_with(config, FakeEngine::default());
    let body = r#"{"ref":"refs/heads/master","repository":{"name":"bob","owner":{"name":"rafecolton"}}}"#;

    let good = github_signature("s3cret", body);
    let response = app
        .clone()
        .oneshot(signed_github_request(body, &good))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["ref"], "master");

    let bad = github_signature("wrong", body);
    let response = app
        .clone()
        .oneshot(signed_github_request(body, &bad))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // 署名ヘッダー無し
    let request = Request::builder()
        .method("POST")
        .uri("/docker-build/github")
        .header("X-GitHub-Event", "push")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(registry.all().len(), 1);
}

fn travis_request(payload: &str, authorization: Option<&str>) -> Request<Body> {
    let mut form = String::from("payload=");
    for byte in payload.bytes() {
        if byte.is_ascii_alphanumeric() {
            form.push(byte as char);
        } else {
            form.push_str(&format!("%{:02X}", byte));
        }
    }

    let mut builder = Request::builder()
        .method("POST")
        .uri("/docker-build/travis")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("Travis-Repo-Slug", "rafecolton/bob");
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    builder.body(Body::from(form)).unwrap()
}

fn travis_payload(status: u8, build_type: &str) -> String {
    format!(
        r#"{{"repository":{{"owner_name":"rafecolton","name":"bob"}},"commit":"abc123","status":{},"type":"{}"}}"#,
        status, build_type
    )
}

#[tokio::test]
async fn test_travis_conflicts_create_no_job() {
    let (app, registry) = app();

    let response = app
        .clone()
        .oneshot(travis_request(&travis_payload(1, "push"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(travis_request(&travis_payload(0, "pull_request"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(registry.is_empty());

    let response = app
        .oneshot(travis_request(&travis_payload(0, "push"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_travis_token_auth() {
    let config = ServerConfig {
        travis_token: Some("s3cret".into()),
        ..Default::default()
    };
    let (app, _) = app_with(config, FakeEngine::default());

    let response = app
        .clone()
        .oneshot(travis_request(&travis_payload(0, "push"), Some("nope")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let digest = travis_authorization("rafecolton/bob", "s3cret");
    let response = app
        .oneshot(travis_request(&travis_payload(0, "push"), Some(&digest)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_disabled_webhook_routes() {
    let config = ServerConfig {
        github_enabled: false,
        travis_enabled: false,
        ..Default::default()
    };
    let (app, _) = app_with(config, FakeEngine::default());

    let response = app
        .clone()
        .oneshot(post_json("/docker-build/github", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(travis_request(&travis_payload(0, "push"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_basic_auth() {
    let config = ServerConfig {
        basic_auth: Some(BasicAuth {
            username: "bob".into(),
            password: "builder".into(),
        }),
        ..Default::default()
    };
    let (app, _) = app_with(config, FakeEngine::default());

    let response = app.clone().oneshot(get("/jobs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

    // /health は認証不要
    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let credentials = base64::engine::general_purpose::STANDARD.encode("bob:builder");
    let request = Request::builder()
        .uri("/jobs")
        .header(header::AUTHORIZATION, format!("Basic {}", credentials))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_job_routes_are_not_found() {
    let (app, _) = app();
    let id = uuid::Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(get(&format!("/jobs/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get(&format!("/jobs/{}/tail", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/jobs/not-a-uuid")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_and_tail_jobs() {
    let (app, _) = app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/docker-build",
            r#"{"account":"o","repo":"x","ref":"main","sync":true}"#,
        ))
        .await
        .unwrap();
    let id = json_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.clone().oneshot(get("/jobs")).await.unwrap();
    let jobs = json_body(response).await;
    assert_eq!(jobs.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get(&format!("/jobs/{}/tail?n=1", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["lines"].as_array().unwrap().len(), 1);
}
