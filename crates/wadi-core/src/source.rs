//! # Source Loading
//!
//! Binds the files named by a line program to source text. Loading is
//! best effort: a file that cannot be found is simply absent.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

/// A source file referenced by debug information.
///
/// Content is read on first access and cached; a file that disappears or
/// is not valid UTF-8 yields `None`.
pub struct DebugSource
{
    path: PathBuf,
    language: String,
    content: OnceCell<Option<String>>,
}

impl DebugSource
{
    /// Source whose content is read from `path` on first access.
    #[must_use]
    pub fn lazy(path: PathBuf, language: &str) -> Self
    {
        Self {
            path,
            language: language.to_string(),
            content: OnceCell::new(),
        }
    }

    /// Source with content already in memory.
    #[must_use]
    pub fn with_content(path: PathBuf, language: &str, content: String) -> Self
    {
        Self {
            path,
            language: language.to_string(),
            content: OnceCell::with_value(Some(content)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    #[must_use]
    pub fn language(&self) -> &str
    {
        &self.language
    }

    /// Full text of the file.
    pub fn content(&self) -> Option<&str>
    {
        self.content
            .get_or_init(|| match fs::read_to_string(&self.path) {
                Ok(text) => Some(text),
                Err(err) => {
                    tracing::debug!(path = %self.path.display(), error = %err, "failed to read source");
                    None
                }
            })
            .as_deref()
    }

    /// Text of 1-based line `line`, without its terminator.
    pub fn line(&self, line: u32) -> Option<&str>
    {
        let index = usize::try_from(line.checked_sub(1)?).ok()?;
        self.content()?.lines().nth(index)
    }
}

impl fmt::Debug for DebugSource
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DebugSource")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("loaded", &self.content.get().is_some())
            .finish()
    }
}

/// Resolves line-program file paths to sources.
pub trait SourceLoader: Send + Sync + fmt::Debug
{
    /// Source for `path`, or `None` when it cannot be found.
    ///
    /// `test_mode` is set when the compilation directory was overridden;
    /// loaders may then accept relative paths and must load eagerly.
    fn load(&self, path: &Path, language: &str, test_mode: bool) -> Option<Arc<DebugSource>>;
}

/// Loads sources from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemSourceLoader;

impl SourceLoader for FileSystemSourceLoader
{
    fn load(&self, path: &Path, language: &str, test_mode: bool) -> Option<Arc<DebugSource>>
    {
        if !test_mode && !path.is_absolute() {
            tracing::trace!(path = %path.display(), "relative source path rejected");
            return None;
        }
        if !fs::metadata(path).is_ok_and(|meta| meta.is_file()) {
            tracing::trace!(path = %path.display(), "source not found");
            return None;
        }

        let source = DebugSource::lazy(path.to_path_buf(), language);
        if test_mode {
            source.content()?;
        }
        Some(Arc::new(source))
    }
}

/// Serves sources from memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceLoader
{
    files: HashMap<PathBuf, String>,
}

impl MemorySourceLoader
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add or replace the text served for `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self
    {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>)
    {
        self.files.insert(path.into(), content.into());
    }
}

impl SourceLoader for MemorySourceLoader
{
    fn load(&self, path: &Path, language: &str, _test_mode: bool) -> Option<Arc<DebugSource>>
    {
        let content = self.files.get(path)?;
        Some(Arc::new(DebugSource::with_content(path.to_path_buf(), language, content.clone())))
    }
}
