use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Result, SynthError};
use crate::resources::lambda::Code;
use crate::template::Expr;

/// Bootstrap bucket that receives staged file assets.
pub const ASSETS_BUCKET: &str = "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}";

/// A local directory deployed as a zipped code bundle, addressed by the
/// hash of its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAsset {
    source: PathBuf,
    hash: String,
    file_count: usize,
}

impl CodeAsset {
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let source = path.as_ref().to_path_buf();
        if !source.is_dir() {
            return Err(SynthError::MissingBundle { path: source });
        }

        let mut files = Vec::new();
        let mut ancestors = vec![canonical(&source)?];
        collect_files(&source, Path::new(""), &mut ancestors, &mut files)?;
        files.sort();

        // Length-prefix each path and body so concatenations can't collide
        let mut hasher = Sha256::new();
        for relative in &files {
            let name = relative.to_string_lossy().replace('\\', "/");
            let full = source.join(relative);
            let contents = fs::read(&full).map_err(|source| SynthError::Io { path: full, source })?;

            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update((contents.len() as u64).to_le_bytes());
            hasher.update(&contents);
        }
        let hash = format!("{:x}", hasher.finalize());

        debug!("Hashed {} files in {} to {}", files.len(), source.display(), hash);

        Ok(Self {
            source,
            hash,
            file_count: files.len(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn object_key(&self) -> String {
        format!("{}.zip", self.hash)
    }

    pub fn code(&self) -> Code {
        Code {
            s3_bucket: Expr::sub(ASSETS_BUCKET),
            s3_key: self.object_key(),
        }
    }
}

/// Walks `root/relative`, following symlinks. `ancestors` holds the
/// canonical directories on the current path; a link back into one of them
/// is skipped.
fn collect_files(
    root: &Path,
    relative: &Path,
    ancestors: &mut Vec<PathBuf>,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let dir = root.join(relative);
    let entries = fs::read_dir(&dir).map_err(|source| SynthError::Io {
        path: dir.clone(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| SynthError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = relative.join(entry.file_name());
        let full = entry.path();
        let metadata = fs::metadata(&full).map_err(|source| SynthError::Io {
            path: full.clone(),
            source,
        })?;

        if metadata.is_dir() {
            let resolved = canonical(&full)?;
            if ancestors.contains(&resolved) {
                warn!("Skipping {}: link cycle", full.display());
                continue;
            }
            ancestors.push(resolved);
            collect_files(root, &path, ancestors, files)?;
            ancestors.pop();
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|source| SynthError::Io {
        path: path.to_path_buf(),
        source,
    })
}
