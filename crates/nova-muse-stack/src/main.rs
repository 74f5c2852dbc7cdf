use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nova_muse_stack::{api, assembly, NovaMuseStack, Revision, StackEnv, StackProps};
use tracing::info;

/// Synthesize the NovaMuse quotes stack into a cloud assembly.
#[derive(Debug, Parser)]
#[command(name = "nova-muse-synth", version)]
struct Args {
    /// Stack revision to synthesize.
    #[arg(long, value_enum, env = "NOVA_MUSE_REVISION", default_value = "custom-domain")]
    revision: Revision,

    /// Directory holding the request handler code bundle.
    #[arg(long, default_value = "lambda")]
    bundle_dir: PathBuf,

    /// Output directory for the cloud assembly.
    #[arg(long, short, default_value = "cdk.out")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();

    let env = StackEnv::from_env(args.revision)?;
    let stack = NovaMuseStack::synth(
        StackProps::builder()
            .env(env)
            .revision(args.revision)
            .bundle_dir(args.bundle_dir)
            .build(),
    )?;

    for route in api::routes_in(&stack.template) {
        info!(
            "{} {} -> {} (authorizer: {})",
            route.method,
            route.path,
            route.target.as_deref().unwrap_or("-"),
            route.authorizer.as_deref().unwrap_or("none")
        );
    }

    let paths = assembly::write(&stack, &args.out_dir)
        .with_context(|| format!("failed to write assembly to {}", args.out_dir.display()))?;
    info!("Template written to {}", paths.template.display());

    Ok(())
}
