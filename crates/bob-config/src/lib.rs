pub mod error;
pub mod logging;
pub mod server;

pub use error::*;
pub use logging::{LogFormat, LogLevel};
pub use server::{BasicAuth, DEFAULT_PORT, ServerConfig};

use std::path::PathBuf;

/// Bobfile のパスを直接指定する環境変数
pub const BOBFILE_PATH_ENV: &str = "BOBFILE_PATH";

/// カレントディレクトリで探すファイル名（優先順）
pub const BOBFILE_CANDIDATES: [&str; 3] = ["Bobfile", "Bobfile.toml", "bob.toml"];

/// プロジェクトの Bobfile を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 BOBFILE_PATH (直接パス指定)
/// 2. カレントディレクトリ: Bobfile, Bobfile.toml, bob.toml
/// 3. ./.bob/ ディレクトリ内: 同様の順序
pub fn find_bobfile() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(path) = std::env::var(BOBFILE_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "BOBFILE_PATH does not exist, searching current directory");
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &BOBFILE_CANDIDATES {
        let path = current_dir.join(filename);
        if path.is_file() {
            return Ok(path);
        }
    }

    // 3. ./.bob/ ディレクトリで検索
    let bob_dir = current_dir.join(".bob");
    if bob_dir.is_dir() {
        for filename in &BOBFILE_CANDIDATES {
            let path = bob_dir.join(filename);
            if path.is_file() {
                return Ok(path);
            }
        }
    }

    Err(ConfigError::BobfileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_bobfile_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("Bobfile"), "version = 1").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_bobfile();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("Bobfile"));
    }

    #[test]
    #[serial]
    fn test_find_bobfile_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("bob.toml"), "version = 1").unwrap();
        fs::write(temp_dir.path().join("Bobfile"), "version = 1").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_bobfile();
        std::env::set_current_dir(original_dir).unwrap();

        // Bobfile が優先される
        assert!(result.unwrap().ends_with("Bobfile"));
    }

    #[test]
    #[serial]
    fn test_find_bobfile_in_bob_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let bob_dir = temp_dir.path().join(".bob");
        fs::create_dir(&bob_dir).unwrap();
        fs::write(bob_dir.join("Bobfile.toml"), "version = 1").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_bobfile();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".bob/Bobfile.toml"));
    }

    #[test]
    #[serial]
    fn test_find_bobfile_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "version = 1").unwrap();

        temp_env::with_var(BOBFILE_PATH_ENV, Some(path.to_str().unwrap()), || {
            assert_eq!(find_bobfile().unwrap(), path);
        });
    }

    #[test]
    #[serial]
    fn test_find_bobfile_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(BOBFILE_PATH_ENV, find_bobfile);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(matches!(result, Err(ConfigError::BobfileNotFound)));
    }
}
