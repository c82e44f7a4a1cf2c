//! File attachments for multipart uploads.
//!
//! A [`FileSource`] is either a file on disk ([`LocalFile`]) or bytes held in
//! memory ([`InMemoryFile`]). Both expose the same four capabilities: open a
//! reader, the form field name, the file name and the declared content type.

use std::borrow::Cow;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::{Error, Result};

/// Form field name used when none is declared.
pub const DEFAULT_FIELD_NAME: &str = "file";

/// A readable attachment stream.
pub type FileReader = Box<dyn Read + Send>;

/// Attachment read from a local path when the request is prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    path: PathBuf,
    file_name: Option<String>,
    field_name: Option<String>,
    content_type: Option<String>,
}

impl LocalFile {
    /// Attach the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_name: None,
            field_name: None,
            content_type: None,
        }
    }

    /// Override the file name (defaults to the path's base name).
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the form field name (defaults to `file`).
    #[must_use]
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    /// Declare the content type instead of sniffing it.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Local path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Attachment backed by bytes already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryFile {
    data: Bytes,
    file_name: String,
    field_name: Option<String>,
    content_type: Option<String>,
}

impl InMemoryFile {
    /// Attach `data` under `file_name` (which may be empty).
    #[must_use]
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            file_name: file_name.into(),
            field_name: None,
            content_type: None,
        }
    }

    /// Set the form field name (defaults to `file`).
    #[must_use]
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    /// Declare the content type instead of sniffing it.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attachment bytes.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// A multipart file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// File read from disk.
    Local(LocalFile),
    /// Bytes held in memory.
    InMemory(InMemoryFile),
}

impl FileSource {
    /// Open a reader over the attachment content.
    pub fn open(&self) -> Result<FileReader> {
        match self {
            Self::Local(file) => File::open(&file.path)
                .map(|f| Box::new(f) as FileReader)
                .map_err(|source| Error::file(file.path.display().to_string(), source)),
            Self::InMemory(file) => Ok(Box::new(Cursor::new(file.data.clone()))),
        }
    }

    /// Form field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        let declared = match self {
            Self::Local(file) => file.field_name.as_deref(),
            Self::InMemory(file) => file.field_name.as_deref(),
        };
        declared
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FIELD_NAME)
    }

    /// File name sent in the `Content-Disposition` header.
    #[must_use]
    pub fn file_name(&self) -> Cow<'_, str> {
        match self {
            Self::Local(file) => match file.file_name.as_deref().filter(|n| !n.is_empty()) {
                Some(name) => Cow::Borrowed(name),
                None => file
                    .path
                    .file_name()
                    .map_or_else(|| file.path.to_string_lossy(), |name| name.to_string_lossy()),
            },
            Self::InMemory(file) => Cow::Borrowed(&file.file_name),
        }
    }

    /// Declared content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Local(file) => file.content_type.as_deref(),
            Self::InMemory(file) => file.content_type.as_deref(),
        }
        .filter(|content_type| !content_type.is_empty())
    }

    /// Read the whole attachment into memory. The reader is dropped before
    /// returning, whether reading succeeded or not.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut reader = self.open()?;
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|source| Error::file(self.file_name(), source))?;
        Ok(content)
    }
}

impl From<LocalFile> for FileSource {
    fn from(file: LocalFile) -> Self {
        Self::Local(file)
    }
}

impl From<InMemoryFile> for FileSource {
    fn from(file: InMemoryFile) -> Self {
        Self::InMemory(file)
    }
}
