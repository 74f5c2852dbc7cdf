//! Writes a synthesized stack to disk as a cloud assembly: the template, the
//! asset manifest that stages the handler bundle, and the top-level manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::asset::{CodeAsset, ASSETS_BUCKET};
use crate::env::StackEnv;
use crate::error::{Result, SynthError};
use crate::stack::NovaMuseStack;

pub const MANIFEST_VERSION: &str = "36.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileSource {
    pub path: String,
    pub packaging: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileDestination {
    pub bucket_name: String,
    pub object_key: String,
    pub region: String,
    pub assume_role_arn: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileAsset {
    pub source: FileSource,
    pub destinations: BTreeMap<String, FileDestination>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssetManifest {
    pub version: String,
    pub files: BTreeMap<String, FileAsset>,
}

impl AssetManifest {
    pub fn for_asset(asset: &CodeAsset, env: &StackEnv) -> Self {
        let destination = FileDestination {
            bucket_name: ASSETS_BUCKET.to_string(),
            object_key: asset.object_key(),
            region: env.region.clone(),
            assume_role_arn: format!(
                "arn:${{AWS::Partition}}:iam::{}:role/cdk-hnb659fds-file-publishing-role-{}-{}",
                env.account, env.account, env.region
            ),
        };

        let mut destinations = BTreeMap::new();
        destinations.insert(format!("{}-{}", env.account, env.region), destination);

        let mut files = BTreeMap::new();
        files.insert(
            asset.hash().to_string(),
            FileAsset {
                source: FileSource {
                    path: asset.source().to_string_lossy().into_owned(),
                    packaging: "zip".to_string(),
                },
                destinations,
            },
        );

        Self {
            version: MANIFEST_VERSION.to_string(),
            files,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CloudAssemblyManifest {
    pub version: String,
    pub artifacts: BTreeMap<String, Artifact>,
}

impl CloudAssemblyManifest {
    pub fn for_stack(stack: &NovaMuseStack) -> Self {
        let assets_artifact = format!("{}.assets", stack.name);
        let environment = stack.env.environment_uri();

        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            assets_artifact.clone(),
            Artifact {
                artifact_type: "cdk:asset-manifest".to_string(),
                environment: "aws://unknown-account/unknown-region".to_string(),
                properties: ArtifactProperties {
                    file: Some(stack.assets_file()),
                    ..Default::default()
                },
                dependencies: Vec::new(),
            },
        );
        artifacts.insert(
            stack.name.clone(),
            Artifact {
                artifact_type: "aws:cloudformation:stack".to_string(),
                environment,
                properties: ArtifactProperties {
                    template_file: Some(stack.template_file()),
                    ..Default::default()
                },
                dependencies: vec![assets_artifact],
            },
        );

        Self {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        }
    }
}

/// Files produced by [`write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPaths {
    pub template: PathBuf,
    pub assets: PathBuf,
    pub manifest: PathBuf,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    fs::write(path, body).map_err(|source| SynthError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write(stack: &NovaMuseStack, out_dir: &Path) -> Result<AssemblyPaths> {
    fs::create_dir_all(out_dir).map_err(|source| SynthError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let paths = AssemblyPaths {
        template: out_dir.join(stack.template_file()),
        assets: out_dir.join(stack.assets_file()),
        manifest: out_dir.join(MANIFEST_FILE),
    };

    write_json(&paths.template, &stack.template)?;
    write_json(&paths.assets, &AssetManifest::for_asset(&stack.asset, &stack.env))?;
    write_json(&paths.manifest, &CloudAssemblyManifest::for_stack(stack))?;

    info!("Wrote cloud assembly to {}", out_dir.display());
    Ok(paths)
}
