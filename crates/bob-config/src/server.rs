//! サーバー設定
//!
//! CLI フラグ > `DOCKER_BUILDER_*` 環境変数 > デフォルト値 の順で
//! 解決された値を保持します（解決自体は CLI 側の clap が行う）。

use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 5000;

/// Basic 認証の資格情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// ユーザー名とパスワードの両方が空でない場合のみ有効
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Self { username, password })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub basic_auth: Option<BasicAuth>,
    /// リポジトリ取得時に使う GitHub API トークン
    pub api_token: Option<String>,
    /// 全ジョブで push を行わない
    pub skip_push: bool,
    /// `sync` 未指定のリクエストを同期実行する
    pub sync_by_default: bool,
    pub travis_enabled: bool,
    /// Travis 認証トークン（設定時のみ検証）
    pub travis_token: Option<String>,
    pub github_enabled: bool,
    /// GitHub webhook の署名検証に使うシークレット（設定時は Basic 認証の代わり）
    pub github_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            basic_auth: None,
            api_token: None,
            skip_push: false,
            sync_by_default: false,
            travis_enabled: true,
            travis_token: None,
            github_enabled: true,
            github_secret: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// 空文字列は未設定として扱う
    pub fn github_secret(&self) -> Option<&str> {
        self.github_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// 起動時に出す警告
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.github_enabled && self.github_secret().is_none() && self.basic_auth.is_none() {
            warnings.push(
                "GitHub webhook route accepts unsigned payloads; set --github-secret".to_string(),
            );
        }
        if self.basic_auth.is_none() {
            warnings.push("basic auth is disabled; build routes are unauthenticated".to_string());
        }
        warnings
    }
}
