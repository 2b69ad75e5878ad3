use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{HrError, HrResult};

/// Photo served when an employee has none of their own.
pub const DEFAULT_PHOTO: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Resume,
    Photo,
}

impl MediaKind {
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Resume => "pdf",
            MediaKind::Photo => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            MediaKind::Resume => "application/pdf",
            MediaKind::Photo => "image/png",
        }
    }
}

/// Maps an employee name to a file under the private resume or photo directory.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    resume_dir: PathBuf,
    photo_dir: PathBuf,
}

impl MediaResolver {
    pub fn new(resume_dir: impl Into<PathBuf>, photo_dir: impl Into<PathBuf>) -> Self {
        MediaResolver {
            resume_dir: resume_dir.into(),
            photo_dir: photo_dir.into(),
        }
    }

    pub fn dir(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Resume => &self.resume_dir,
            MediaKind::Photo => &self.photo_dir,
        }
    }

    /// Path of the asset for `employee`.
    ///
    /// The name must be a single plain path component, and the canonical
    /// file must live directly in the canonical asset directory with the
    /// expected extension; anything else is `NotFound`, whether or not a file
    /// exists at the traversed location. A missing photo falls back to
    /// `default.png`; a missing resume has no fallback.
    pub fn resolve(&self, kind: MediaKind, employee: &str) -> HrResult<PathBuf> {
        if !is_plain_name(employee) {
            return Err(HrError::NotFound(format!(
                "rejected {} name {:?}",
                kind.extension(),
                employee
            )));
        }

        let dir = fs::canonicalize(self.dir(kind)).map_err(|e| {
            HrError::NotFound(format!("{} directory: {}", kind.extension(), e))
        })?;

        match sandboxed(&dir, employee, kind)? {
            Some(path) => Ok(path),
            None if kind == MediaKind::Photo => sandboxed(&dir, DEFAULT_PHOTO, kind)?
                .ok_or_else(|| HrError::NotFound("no photo and no default photo".to_string())),
            None => Err(HrError::NotFound(format!("no resume for {}", employee))),
        }
    }
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// `Ok(None)` when the file does not exist; `Err` when it exists but resolves
/// outside `dir` or to the wrong extension.
fn sandboxed(dir: &Path, stem: &str, kind: MediaKind) -> HrResult<Option<PathBuf>> {
    let candidate = dir.join(format!("{}.{}", stem, kind.extension()));
    if !candidate.is_file() {
        return Ok(None);
    }
    let resolved = fs::canonicalize(&candidate)
        .map_err(|e| HrError::NotFound(format!("{}: {}", candidate.display(), e)))?;

    let in_dir = resolved.parent() == Some(dir);
    let ext_ok = resolved
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(kind.extension()));
    if in_dir && ext_ok {
        Ok(Some(resolved))
    } else {
        Err(HrError::NotFound(format!(
            "{} escapes {}",
            candidate.display(),
            dir.display()
        )))
    }
}
