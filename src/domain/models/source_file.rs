use std::path::{Path, PathBuf};

/// A file quoted to the model, with the path it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(path, text))
    }

    /// Whether a path reported by the test framework names this file.
    pub fn is_reported_as(&self, reported: &str) -> bool {
        strip_current_dir(&self.path) == strip_current_dir(Path::new(reported))
    }
}

/// A user-supplied context block (`title:content` on the command line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub title: String,
    pub content: String,
}

impl Resource {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

impl std::str::FromStr for Resource {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.split_once(':')
            .map(|(title, content)| Self::new(title.trim(), content.trim()))
            .ok_or_else(|| format!("expected <title>:<content>, got '{raw}'"))
    }
}

fn strip_current_dir(path: &Path) -> &Path {
    path.strip_prefix(".").unwrap_or(path)
}
