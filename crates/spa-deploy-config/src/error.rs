use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file set by SPA_DEPLOY_CONFIG does not exist: {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    #[error(
        "Failed to parse {}: {source}\n\n\
        Hint:\n  • Known keys are bucket, region, cloudfront, domain, output, skip_build",
        .path.display()
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
