//! Persisting generated artifacts as Markdown files.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    chrono::Local,
    tokio::{fs::OpenOptions, io::AsyncWriteExt},
    tracing::debug,
};

/// Maximum characters of the logical name kept in a file name.
const SLUG_MAX_CHARS: usize = 40;

/// Numbered variants tried when a file name is already taken.
const MAX_NAME_SUFFIX: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where generated text ends up.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `content` under `category` and return its location.
    async fn store(
        &self,
        logical_name: &str,
        content: &str,
        category: &str,
    ) -> Result<String, StorageError>;
}

/// Filesystem store: `<root>/<category>/<slug>_<YYYYMMDD_HHMMSS>.md`.
///
/// Files are never overwritten; a name already taken gets `_2`, `_3`, ...
/// before the extension.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_stem(logical_name: &str) -> String {
        format!(
            "{}_{}",
            slugify(logical_name),
            Local::now().format("%Y%m%d_%H%M%S")
        )
    }

    /// Create a fresh file under `dir` and write `content` to it.
    async fn write_new(dir: &Path, stem: &str, content: &str) -> Result<PathBuf, StorageError> {
        let mut last_err = None;
        for n in 1..=MAX_NAME_SUFFIX {
            let path = match n {
                1 => dir.join(format!("{stem}.md")),
                n => dir.join(format!("{stem}_{n}.md")),
            };
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    last_err = Some((path, e));
                    continue;
                },
                Err(source) => return Err(StorageError::Write { path, source }),
            };
            let written = match file.write_all(content.as_bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            return match written {
                Ok(()) => Ok(path),
                Err(source) => Err(StorageError::Write { path, source }),
            };
        }
        let (path, source) = last_err.unwrap_or_else(|| {
            (
                dir.join(format!("{stem}.md")),
                std::io::Error::from(std::io::ErrorKind::AlreadyExists),
            )
        });
        Err(StorageError::Write { path, source })
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(
        &self,
        logical_name: &str,
        content: &str,
        category: &str,
    ) -> Result<String, StorageError> {
        let category = slugify(category);
        let dir = self.root.join(&category);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let path = Self::write_new(&dir, &Self::file_stem(logical_name), content).await?;

        debug!(path = %path.display(), bytes = content.len(), "artifact stored");
        Ok(path.display().to_string())
    }
}

/// File-name-safe form of a logical name.
///
/// Letters and digits of any script are kept, whitespace, `-` and `_` become
/// `_`, everything else is dropped. Runs of `_` collapse, the result is cut
/// to 40 characters, and an empty result becomes `untitled`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !slug.ends_with('_') {
            slug.push('_');
        }
    }

    let slug: String = slug.trim_matches('_').chars().take(SLUG_MAX_CHARS).collect();
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("今日摇滚热点", "今日摇滚热点")]
    #[case("Rock  news - today", "Rock_news_today")]
    #[case("a/b\\c:d", "abcd")]
    #[case("  __hello__  ", "hello")]
    #[case("!!!", "untitled")]
    #[case("", "untitled")]
    #[case("Ünïcödé ok", "Ünïcödé_ok")]
    fn test_slugify(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn test_slug_is_capped() {
        let long = "摇".repeat(100);
        assert_eq!(slugify(&long).chars().count(), SLUG_MAX_CHARS);
    }

    #[test]
    fn test_file_name_shape() {
        let stem = FsArtifactStore::file_stem("Rock news");
        assert!(stem.starts_with("Rock_news_"));
        // slug + '_' + YYYYMMDD_HHMMSS
        assert_eq!(stem.len(), "Rock_news_".len() + 15);
    }

    #[tokio::test]
    async fn test_store_writes_under_category() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let location = store
            .store("今日摇滚热点", "🎸 content", "articles")
            .await
            .unwrap();

        let path = PathBuf::from(&location);
        assert!(path.starts_with(dir.path().join("articles")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "🎸 content");
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("今日摇滚热点_"));
    }

    #[tokio::test]
    async fn test_same_topic_twice_keeps_both_articles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let first = store
            .store("今日摇滚热点", "article for requester a", "articles")
            .await
            .unwrap();
        let second = store
            .store("今日摇滚热点", "article for requester b", "articles")
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(
            std::fs::read_to_string(&first).unwrap(),
            "article for requester a"
        );
        assert_eq!(
            std::fs::read_to_string(&second).unwrap(),
            "article for requester b"
        );
    }

    #[tokio::test]
    async fn test_taken_name_gets_numbered_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("topic_x.md"), "old").unwrap();
        std::fs::write(dir.path().join("topic_x_2.md"), "old").unwrap();

        let path = FsArtifactStore::write_new(dir.path(), "topic_x", "new")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("topic_x_3.md"));
        assert_eq!(std::fs::read_to_string(dir.path().join("topic_x.md")).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_store_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let store = FsArtifactStore::new(&blocker);
        let err = store.store("t", "c", "articles").await.unwrap_err();
        assert!(matches!(err, StorageError::CreateDir { .. }));
    }
}
