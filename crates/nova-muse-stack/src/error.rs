use std::path::PathBuf;

/// Errors raised while synthesizing the stack.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("AWS_ACCOUNT_ID and AWS_REGION must be set")]
    MissingAccountOrRegion,

    #[error("ACM_ARN must be set to attach the custom domain certificate")]
    MissingCertificateArn,

    #[error("there is already a resource with logical id '{0}'")]
    DuplicateLogicalId(String),

    #[error("'{from}' references unknown logical id '{target}'")]
    DanglingReference { from: String, target: String },

    #[error("code bundle {} is not a directory", path.display())]
    MissingBundle { path: PathBuf },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize template: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SynthError>;
