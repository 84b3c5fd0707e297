mod build;
mod confirm;

use clap::Parser;
use colored::Colorize;
use spa_deploy_cloud::{
    AutoConfirm, CloudError, Confirm, DeployRequest, DeployState, DeploySummary, Deployer,
    ResourceKind, StateStore, TeardownReport, Waiter,
};
use spa_deploy_cloud_aws::AwsClients;
use spa_deploy_config::DeployConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Parser)]
#[command(name = "spa-deploy", version)]
#[command(
    about = "Build a single-page app and publish it to S3, optionally behind CloudFront",
    long_about = None
)]
struct Cli {
    /// プロジェクトディレクトリ
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// ビルド出力ディレクトリ（省略時は dist/ または build/）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// S3バケット名
    #[arg(short, long)]
    bucket: Option<String>,

    /// CloudFrontディストリビューション経由で配信する
    #[arg(long)]
    cloudfront: bool,

    /// ディストリビューションに割り当てるカスタムドメイン
    #[arg(long, requires = "cloudfront")]
    domain: Option<String>,

    /// バケットのAWSリージョン [default: us-east-1]
    #[arg(short, long, env = "SPA_DEPLOY_REGION")]
    region: Option<String>,

    /// ビルドせずに既存の出力をアップロードする
    #[arg(long)]
    skip_build: bool,

    /// このプロジェクトで記録された全リソースを削除する
    #[arg(long)]
    destroy: bool,

    /// すべての確認に yes で答える
    #[arg(short, long)]
    yes: bool,
}

/// 設定ファイルの値にCLIフラグを上書きしたもの
struct Settings {
    bucket: Option<String>,
    region: String,
    cloudfront: bool,
    domain: Option<String>,
    output: Option<PathBuf>,
    skip_build: bool,
}

impl Settings {
    fn merge(cli: &Cli, config: DeployConfig, project_dir: &Path) -> Self {
        // どちらもプロジェクトディレクトリからの相対パス
        let output = cli
            .output
            .as_ref()
            .map(|output| project_dir.join(output))
            .or_else(|| config.output_dir(project_dir));
        Self {
            bucket: cli.bucket.clone().or(config.bucket),
            region: cli
                .region
                .clone()
                .or(config.region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            cloudfront: cli.cloudfront || config.cloudfront.unwrap_or(false),
            domain: cli.domain.clone().or(config.domain),
            output,
            skip_build: cli.skip_build || config.skip_build.unwrap_or(false),
        }
    }

    /// 値の組み合わせを検証し、デプロイ先バケットを返す
    fn check(&self) -> anyhow::Result<&str> {
        let Some(bucket) = self.bucket.as_deref() else {
            anyhow::bail!("No bucket given. Pass --bucket or set `bucket` in spa_deploy.yaml");
        };
        if self.domain.is_some() && !self.cloudfront {
            anyhow::bail!("A custom domain needs CloudFront. Pass --cloudfront as well");
        }
        Ok(bucket)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let project_dir = cli.dir.clone();
    if !project_dir.is_dir() {
        anyhow::bail!("Project directory not found: {}", project_dir.display());
    }

    let config = spa_deploy_config::load(&project_dir)?;
    let settings = Settings::merge(&cli, config, &project_dir);
    if !cli.destroy {
        settings.check()?;
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping at the next check");
            ctrl_c.cancel();
        }
    });

    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(confirm::StdinConfirm)
    };

    let store = StateStore::new(&project_dir);
    let region = if cli.destroy {
        teardown_region(&store.load().await?, &settings.region)
    } else {
        settings.region.clone()
    };

    let aws = AwsClients::from_env(&region).await;
    let deployer = Deployer::new(aws.clients(), store)
        .with_waiter(Waiter::new(cancel))
        .with_confirm(confirm);

    if cli.destroy {
        destroy(&deployer).await
    } else {
        deploy(&deployer, &settings, &project_dir).await
    }
}

/// 削除時に使うリージョン
///
/// S3はリージョン間のリダイレクトを追わないため、記録済みのバケットは
/// フラグの値に関わらず作成時のリージョンで操作する。
fn teardown_region(state: &DeployState, fallback: &str) -> String {
    match state.trusted(ResourceKind::Bucket, &state.region) {
        Some(region) => {
            if region != fallback {
                tracing::info!("Using recorded bucket region {} for teardown", region);
            }
            region.to_string()
        }
        None => fallback.to_string(),
    }
}

async fn deploy(
    deployer: &Deployer,
    settings: &Settings,
    project_dir: &Path,
) -> anyhow::Result<()> {
    let bucket = settings.check()?;

    if settings.skip_build {
        println!("{}", "Skipping build".dimmed());
    } else {
        println!("{}", "Building project...".blue());
        build::run_build(project_dir).await?;
        println!("{}", "✓ Build finished".green());
    }

    let output_dir = build::detect_output_dir(project_dir, settings.output.as_deref())?;
    println!("{} {}", "Output:".cyan(), output_dir.display());

    let mut request = DeployRequest::new(bucket, &settings.region)
        .with_cdn(settings.cloudfront)
        .with_output_dir(output_dir);
    if let Some(domain) = &settings.domain {
        request = request.with_domain(domain);
    }

    println!();
    println!("{} {}", "Deploying to".blue(), bucket.cyan().bold());
    let summary = deployer.deploy(&request).await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &DeploySummary) {
    println!();
    for outcome in &summary.outcomes {
        println!(
            "  {} {} {} ({})",
            "✓".green(),
            outcome.kind,
            outcome.id.cyan(),
            outcome.action
        );
    }
    if let Some(invalidation) = &summary.invalidation_id {
        println!("  {} Cache invalidation {}", "✓".green(), invalidation);
    }

    println!();
    println!(
        "{} {} ({:.1}s)",
        "✓ Deploy complete:".green().bold(),
        summary,
        summary.duration_ms as f64 / 1000.0
    );
    if let Some(url) = &summary.site_url {
        println!("  {} {}", "URL:".cyan(), url.bold());
    }
}

async fn destroy(deployer: &Deployer) -> anyhow::Result<()> {
    println!("{}", "Destroying resources...".yellow());
    let report = match deployer.destroy().await {
        Ok(report) => report,
        Err(CloudError::NothingToDestroy) => {
            println!("{}", "No resources recorded for this project".dimmed());
            return Ok(());
        }
        Err(CloudError::Aborted) => {
            println!("{}", "Cancelled".yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    print_report(&report);
    Ok(())
}

fn print_report(report: &TeardownReport) {
    println!();
    for kind in &report.deleted {
        println!("  {} Deleted {}", "✓".green(), kind);
    }
    for warning in &report.warnings {
        println!("  {} {}: {}", "⚠".yellow(), warning.kind, warning.message);
    }

    println!();
    if report.is_clean() {
        println!("{}", "✓ All resources destroyed".green().bold());
    } else {
        println!(
            "{}",
            format!(
                "⚠ Finished with {} warning(s); remaining resources may need manual cleanup",
                report.warnings.len()
            )
            .yellow()
            .bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["spa-deploy", "--bucket", "from-flag", "--cloudfront"]);
        let config = DeployConfig {
            bucket: Some("from-config".to_string()),
            region: Some("eu-west-1".to_string()),
            output: Some(PathBuf::from("out")),
            ..Default::default()
        };

        let settings = Settings::merge(&cli, config, Path::new("/srv/app"));
        assert_eq!(settings.bucket.as_deref(), Some("from-flag"));
        assert_eq!(settings.region, "eu-west-1");
        assert!(settings.cloudfront);
        assert_eq!(settings.output, Some(PathBuf::from("/srv/app/out")));
    }

    #[test]
    fn test_flag_output_is_project_relative() {
        let cli = Cli::parse_from(["spa-deploy", "--output", "public"]);
        let config = DeployConfig {
            output: Some(PathBuf::from("out")),
            ..Default::default()
        };

        let settings = Settings::merge(&cli, config, Path::new("/srv/app"));
        assert_eq!(settings.output, Some(PathBuf::from("/srv/app/public")));
    }

    #[test]
    fn test_unset_flags_fall_back() {
        temp_env::with_var_unset("SPA_DEPLOY_REGION", || {
            let cli = Cli::parse_from(["spa-deploy"]);
            let settings = Settings::merge(&cli, DeployConfig::default(), Path::new("."));
            assert_eq!(settings.region, DEFAULT_REGION);
            assert!(settings.bucket.is_none());
            assert!(!settings.skip_build);
        });
    }

    #[test]
    fn test_region_from_env() {
        temp_env::with_var("SPA_DEPLOY_REGION", Some("ap-northeast-1"), || {
            let cli = Cli::parse_from(["spa-deploy"]);
            let settings = Settings::merge(&cli, DeployConfig::default(), Path::new("."));
            assert_eq!(settings.region, "ap-northeast-1");
        });
    }

    #[test]
    fn test_config_domain_without_cloudfront_is_rejected() {
        let cli = Cli::parse_from(["spa-deploy", "--bucket", "my-app"]);
        let config = DeployConfig {
            domain: Some("app.example.com".to_string()),
            ..Default::default()
        };

        let settings = Settings::merge(&cli, config, Path::new("."));
        let err = settings.check().unwrap_err();
        assert!(err.to_string().contains("--cloudfront"));
    }

    #[test]
    fn test_teardown_uses_recorded_bucket_region() {
        let mut state = DeployState::new();
        state.mark_created(ResourceKind::Bucket);
        state.bucket_name = Some("my-app".to_string());
        state.region = Some("eu-west-1".to_string());

        assert_eq!(teardown_region(&state, DEFAULT_REGION), "eu-west-1");
    }

    #[test]
    fn test_teardown_region_falls_back_without_bucket_tag() {
        let mut state = DeployState::new();
        state.region = Some("eu-west-1".to_string());
        assert_eq!(teardown_region(&state, "ap-northeast-1"), "ap-northeast-1");

        assert_eq!(
            teardown_region(&DeployState::new(), DEFAULT_REGION),
            DEFAULT_REGION
        );
    }

    #[test]
    fn test_domain_requires_cloudfront() {
        let result = Cli::try_parse_from(["spa-deploy", "--domain", "app.example.com"]);
        assert!(result.is_err());
    }
}
