pub mod error;

pub use error::*;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_ENV: &str = "SPA_DEPLOY_CONFIG";

const CANDIDATES: [&str; 2] = ["spa_deploy.yaml", ".spa_deploy.yaml"];

/// 毎回フラグで渡す代わりにプロジェクトで固定できる値
///
/// すべて省略可能。CLIフラグが優先される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub cloudfront: Option<bool>,
    pub domain: Option<String>,
    /// ビルド出力ディレクトリ（プロジェクトディレクトリからの相対パス）
    pub output: Option<PathBuf>,
    pub skip_build: Option<bool>,
}

impl DeployConfig {
    /// プロジェクトディレクトリを基準に解決した出力ディレクトリ
    pub fn output_dir(&self, project_dir: &Path) -> Option<PathBuf> {
        self.output.as_ref().map(|output| project_dir.join(output))
    }
}

/// ユーザー設定ディレクトリ内の spa-deploy グローバル設定
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spa-deploy").join("config.yaml"))
}

/// プロジェクトの設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 SPA_DEPLOY_CONFIG (直接パス指定、設定時は存在必須)
/// 2. プロジェクトディレクトリ: spa_deploy.yaml, .spa_deploy.yaml
/// 3. ~/.config/spa-deploy/config.yaml (グローバル設定)
///
/// 設定ファイルがなくてもエラーにはならない。
pub fn find_config_file(project_dir: &Path) -> Result<Option<PathBuf>> {
    search(project_dir, global_config_path())
}

fn search(project_dir: &Path, global: Option<PathBuf>) -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    for filename in &CANDIDATES {
        let path = project_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    Ok(global.filter(|path| path.exists()))
}

/// 設定ファイルを1つ読み込む
pub fn load_file(path: &Path) -> Result<DeployConfig> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(DeployConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// プロジェクトの設定を読み込む（ファイルがなければ空）
pub fn load(project_dir: &Path) -> Result<DeployConfig> {
    match find_config_file(project_dir)? {
        Some(path) => load_file(&path),
        None => Ok(DeployConfig::default()),
    }
}
