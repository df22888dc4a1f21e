use std::path::Path;
use std::sync::Arc;

/// One named file of Vision source text.
///
/// A project is nothing more than an ordered list of these; archive formats
/// and manifests are the host's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: Arc<str>,
    pub code: String,
}

impl SourceFile {
    pub fn new(name: impl Into<Arc<str>>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Read a file from disk, naming it after the file stem (`main.vis` -> `main`).
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let code = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, code))
    }
}
