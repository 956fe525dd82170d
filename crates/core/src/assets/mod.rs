use std::path::{Path, PathBuf};

use crate::{
    graph::{MediaKind, PlaybackMode, Stage},
    ImagicError, Result,
};

/// Where a stage's media lives once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    File(PathBuf),
    /// Anything with a `scheme://` prefix, handed to the backend untouched.
    Uri(String),
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Uri(uri) => f.write_str(uri),
        }
    }
}

/// Everything a media backend needs to prime one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    pub stage_id: String,
    pub kind: MediaKind,
    pub locator: Locator,
    pub mode: PlaybackMode,
}

/// Resolves stage sources into backend requests.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: Option<PathBuf>,
    verify_files: bool,
}

impl Default for MediaLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self {
            root: None,
            verify_files: true,
        }
    }

    /// Relative sources are looked up under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            verify_files: true,
        }
    }

    /// Skips the existence check, for backends that resolve bundled names.
    pub fn unchecked() -> Self {
        Self {
            root: None,
            verify_files: false,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn resolve(&self, stage: &Stage) -> Result<MediaRequest> {
        let source = stage.source.trim();
        if source.is_empty() {
            return Err(ImagicError::media(
                &stage.id,
                "stage has no media source",
            ));
        }

        let locator = if source.contains("://") {
            Locator::Uri(source.to_string())
        } else {
            let path = Path::new(source);
            let path = match &self.root {
                Some(root) if path.is_relative() => root.join(path),
                _ => path.to_path_buf(),
            };
            if self.verify_files && !path.is_file() {
                return Err(ImagicError::media(
                    path.display().to_string(),
                    "file not found",
                ));
            }
            Locator::File(path)
        };

        Ok(MediaRequest {
            stage_id: stage.id.clone(),
            kind: stage.media_kind,
            locator,
            mode: stage.playback_mode,
        })
    }
}
