use std::path::PathBuf;

use bon::Builder;
use tracing::info;

use crate::asset::CodeAsset;
use crate::env::{Revision, StackEnv};
use crate::error::Result;
use crate::template::Template;
use crate::{api, compute, edge, identity, storage};

pub const STACK_NAME: &str = "NovaMuseStack";
pub const STACK_DESCRIPTION: &str = "NovaMuse quotes API: quotes table, request handlers, user pool and REST gateway";

#[derive(Debug, Clone, Builder)]
pub struct StackProps {
    pub env: StackEnv,
    #[builder(default)]
    pub revision: Revision,
    /// Directory holding the handler code bundle.
    #[builder(into)]
    pub bundle_dir: PathBuf,
    #[builder(into, default = STACK_NAME.to_string())]
    pub stack_name: String,
}

/// The synthesized stack: its resource graph plus what is needed to stage
/// and deploy it.
#[derive(Debug, Clone)]
pub struct NovaMuseStack {
    pub name: String,
    pub env: StackEnv,
    pub revision: Revision,
    pub asset: CodeAsset,
    pub template: Template,
}

impl NovaMuseStack {
    pub fn synth(props: StackProps) -> Result<Self> {
        let StackProps {
            env,
            revision,
            bundle_dir,
            stack_name,
        } = props;
        env.check(revision)?;

        info!(
            "Synthesizing {} ({} revision) for {}",
            stack_name,
            revision,
            env.environment_uri()
        );

        let certificate_arn = match revision {
            Revision::Base => None,
            Revision::CustomDomain => env.certificate().map(str::to_string),
        };

        let asset = CodeAsset::from_dir(&bundle_dir)?;
        let mut template = Template::new(STACK_DESCRIPTION);

        let table = storage::declare(&mut template)?;
        let handlers = compute::declare(&mut template, &table, &asset)?;
        let identity = identity::declare(&mut template)?;
        let api = api::declare(&mut template, &handlers, &identity)?;
        if let Some(arn) = certificate_arn {
            edge::declare(&mut template, &api, &arn)?;
        }

        template.validate()?;

        info!(
            "Synthesized {} resources and {} outputs",
            template.resources.len(),
            template.outputs.len()
        );

        Ok(Self {
            name: stack_name,
            env,
            revision,
            asset,
            template,
        })
    }

    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.name)
    }

    pub fn assets_file(&self) -> String {
        format!("{}.assets.json", self.name)
    }
}
