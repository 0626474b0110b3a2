// Evidence and diagnostic artifacts
//
// Screenshots and HTML dumps land at deterministic paths:
// `<root>/<scenario>/<checkpoint>.png` on success and
// `<root>/<scenario>/failure.{png,html}` on failure.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// File stem of the failure screenshot and HTML dump
pub const FAILURE_STEM: &str = "failure";

/// Root directory for all scenario artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifacts for one scenario run
    pub fn scenario(&self, scenario: &str) -> ScenarioArtifacts {
        ScenarioArtifacts {
            dir: self.root.join(slug(scenario)),
            written: Mutex::new(Vec::new()),
        }
    }
}

/// Artifact directory of a single scenario, recording every file written
#[derive(Debug)]
pub struct ScenarioArtifacts {
    dir: PathBuf,
    written: Mutex<Vec<PathBuf>>,
}

impl ScenarioArtifacts {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint screenshot called `name`
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", slug(name)))
    }

    pub fn failure_screenshot_path(&self) -> PathBuf {
        self.dir.join(format!("{}.png", FAILURE_STEM))
    }

    pub fn failure_html_path(&self) -> PathBuf {
        self.dir.join(format!("{}.html", FAILURE_STEM))
    }

    /// Writes a checkpoint screenshot and returns its path
    pub async fn write_checkpoint(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.checkpoint_path(name);
        self.write(&path, png).await?;
        Ok(path)
    }

    pub async fn write_failure_screenshot(&self, png: &[u8]) -> Result<PathBuf> {
        let path = self.failure_screenshot_path();
        self.write(&path, png).await?;
        Ok(path)
    }

    pub async fn write_failure_html(&self, html: &str) -> Result<PathBuf> {
        let path = self.failure_html_path();
        self.write(&path, html.as_bytes()).await?;
        Ok(path)
    }

    /// Every path written so far, in write order
    pub fn written(&self) -> Vec<PathBuf> {
        self.written.lock().clone()
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| Error::Artifact {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(path, contents)
            .await
            .map_err(|source| Error::Artifact {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("Wrote artifact {}", path.display());
        self.written.lock().push(path.to_path_buf());
        Ok(())
    }
}

/// File-name-safe form of a scenario or checkpoint name.
///
/// Lowercases, folds Spanish accents, and collapses everything that is not
/// ASCII alphanumeric into single dashes: `"Licán Ray"` becomes `"lican-ray"`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        };
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("unnamed");
    }
    out
}
