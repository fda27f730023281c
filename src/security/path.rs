//! Path containment for files served from disk.
//!
//! # Responsibilities
//! - Resolve a client-supplied name against a base directory
//! - Reject anything that resolves outside the base (`..`, absolute paths)
//! - Deny dotfiles and symlinks that point out of the base
//! - Turn client-supplied upload names into safe, unique file names
//!
//! # Design Decisions
//! - Resolution is lexical first (no filesystem access), so a missing file
//!   and a traversal attempt are told apart before any I/O happens
//! - Containment compares whole components: `/srv/public-old` is not inside
//!   `/srv/public`

use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

/// Failure to place a client-supplied name inside a base directory.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("path '{0}' escapes its base directory")]
    Traversal(String),
    #[error("invalid path input: {0}")]
    InvalidInput(&'static str),
    #[error("file extension '{0}' is not allowed")]
    DisallowedExtension(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A path proven to lie inside a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainedPath {
    base: PathBuf,
    path: PathBuf,
}

impl ContainedPath {
    /// The resolved absolute path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the request resolved to the base directory itself.
    pub fn is_base(&self) -> bool {
        self.path == self.base
    }

    /// True when any component below the base starts with a dot.
    pub fn has_hidden_component(&self) -> bool {
        self.path
            .strip_prefix(&self.base)
            .map(|rest| {
                rest.components().any(|c| match c {
                    Component::Normal(name) => name.to_string_lossy().starts_with('.'),
                    _ => false,
                })
            })
            .unwrap_or(true)
    }

    /// Re-check containment on the real filesystem.
    ///
    /// Canonicalizes both sides so a symlink placed inside the base cannot be
    /// used to reach a file outside of it. Fails with `Io` when the file does
    /// not exist.
    pub async fn ensure_canonical(&self) -> Result<PathBuf, PathError> {
        let base = tokio::fs::canonicalize(&self.base).await?;
        let real = tokio::fs::canonicalize(&self.path).await?;
        if real.starts_with(&base) {
            Ok(real)
        } else {
            Err(PathError::Traversal(self.path.display().to_string()))
        }
    }
}

/// Resolve `requested` against `base` and require the result to stay inside it.
pub fn resolve_within(base: &Path, requested: &str) -> Result<ContainedPath, PathError> {
    if requested.contains('\0') {
        return Err(PathError::InvalidInput("NUL byte in path"));
    }

    let base = normalize(&std::path::absolute(base)?);
    let resolved = normalize(&base.join(requested));

    if resolved.starts_with(&base) {
        Ok(ContainedPath { base, path: resolved })
    } else {
        Err(PathError::Traversal(requested.to_string()))
    }
}

/// Boolean form of [`resolve_within`].
pub fn is_safe_file(requested: &str, base: &Path) -> bool {
    resolve_within(base, requested).is_ok()
}

/// Collapse `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

const MAX_UPLOAD_STEM: usize = 100;

/// Build a storage name for an uploaded file.
///
/// Only the last path component of `original` is kept (both `/` and `\`
/// count as separators). Characters outside `[A-Za-z0-9._-]` become `_`. The
/// extension must be in `allowed_exts` (compared case-insensitively). A random
/// prefix keeps two uploads with the same name from overwriting each other.
pub fn sanitize_upload_name(original: &str, allowed_exts: &[String]) -> Result<String, PathError> {
    if original.contains('\0') {
        return Err(PathError::InvalidInput("NUL byte in file name"));
    }

    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name.starts_with('.') {
        return Err(PathError::InvalidInput("file name is empty or hidden"));
    }

    let (stem, ext) = name
        .rsplit_once('.')
        .ok_or(PathError::InvalidInput("file name has no extension"))?;
    let ext = ext.to_ascii_lowercase();
    if !allowed_exts.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)) {
        return Err(PathError::DisallowedExtension(ext));
    }

    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .take(MAX_UPLOAD_STEM)
        .collect();

    Ok(format!("{}-{}.{}", Uuid::new_v4().simple(), stem, ext))
}
