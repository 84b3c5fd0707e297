use colored::Colorize;
use std::path::{Path, PathBuf};

/// ビルド出力として探すディレクトリ（優先順）
const OUTPUT_CANDIDATES: [&str; 2] = ["dist", "build"];

/// ビルドスクリプトを実行するパッケージマネージャー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Yarn,
    Npm,
}

impl PackageManager {
    /// yarn.lock があれば yarn、なければ npm
    pub fn detect(project_dir: &Path) -> Self {
        if project_dir.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else {
            PackageManager::Npm
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm",
        }
    }
}

/// プロジェクトディレクトリで `<pm> run build` を実行
pub async fn run_build(project_dir: &Path) -> anyhow::Result<()> {
    let pm = PackageManager::detect(project_dir);
    println!("  {} {} run build", "→".blue(), pm.program());
    tracing::debug!("Building {} with {}", project_dir.display(), pm.program());

    let output = tokio::process::Command::new(pm.program())
        .arg("run")
        .arg("build")
        .current_dir(project_dir)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", pm.program(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!(
            "{} run build failed:\n{}",
            pm.program(),
            stderr
        ));
    }

    Ok(())
}

/// ビルド出力ディレクトリを決定
///
/// 明示されたディレクトリは存在必須。指定がなければプロジェクト内の
/// `dist/`、`build/` の順に探す。
pub fn detect_output_dir(project_dir: &Path, explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        if !dir.is_dir() {
            anyhow::bail!("Output directory not found: {}", dir.display());
        }
        return Ok(dir.to_path_buf());
    }

    OUTPUT_CANDIDATES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|dir| dir.is_dir())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No build output found in {} (looked for {})",
                project_dir.display(),
                OUTPUT_CANDIDATES.join(", ")
            )
        })
}
