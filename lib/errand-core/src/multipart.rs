//! Multipart form data for file uploads.
//!
//! A [`Form`] is a list of [`Part`]s serialized with a boundary into a
//! `multipart/form-data` body. File parts are built from a
//! [`FileSource`](crate::FileSource); plain form fields carry no content type.
//!
//! # Example
//!
//! ```
//! use errand_core::{FileSource, Form, InMemoryFile, Part};
//!
//! let source = FileSource::from(InMemoryFile::new("notes.txt", "hello"));
//! let form = Form::with_boundary("xyz")
//!     .part(Part::from_source(&source).expect("in-memory read"))
//!     .field("title", "notes");
//!
//! let (content_type, body) = form.into_body();
//! assert_eq!(content_type, "multipart/form-data; boundary=xyz");
//! assert!(body.starts_with(b"--xyz\r\n"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{FileSource, Result, detect_content_type};

/// A single part in a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a plain field part with the given name and data.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Create a file part from an attachment.
    ///
    /// The whole attachment is read into memory. When no content type was
    /// declared it is sniffed from the leading bytes.
    pub fn from_source(source: &FileSource) -> Result<Self> {
        let content = source.read_all()?;
        let content_type = match source.content_type() {
            Some(declared) => declared.to_string(),
            None => detect_content_type(&content).to_string(),
        };
        tracing::debug!(
            field = source.field_name(),
            file = %source.file_name(),
            content_type,
            size = content.len(),
            "multipart file part"
        );

        Ok(Self {
            name: source.field_name().to_string(),
            filename: Some(source.file_name().into_owned()),
            content_type: Some(content_type),
            data: Bytes::from(content),
        })
    }

    /// Set the filename for this part.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Get the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get the part data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// A multipart form containing multiple parts.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a unique boundary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            boundary: generate_boundary(),
        }
    }

    /// Create a new form with a custom boundary.
    ///
    /// The boundary should be a unique string that doesn't appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part to the form.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a plain form field.
    #[must_use]
    pub fn field(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::new(name, value.into()))
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the parts in this form.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get the Content-Type header value for this form.
    ///
    /// Returns `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Convert the form into a body.
    ///
    /// Returns a tuple of (content-type header value, body bytes).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let content_type = self.content_type();
        let body = self.encode();
        (content_type, body)
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(escape_quotes(&part.name).as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(escape_quotes(filename).as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

/// Escape `\` and `"` inside a quoted header parameter.
fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Generate a boundary unique within the process.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("----ErrandBoundary{timestamp:x}{sequence:04x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryFile, LocalFile};

    #[test]
    fn part_from_declared_source() {
        let source = FileSource::from(
            InMemoryFile::new("greeting.txt", "hello").with_content_type("text/plain"),
        );
        let part = Part::from_source(&source).expect("part");
        assert_eq!(part.name(), "file");
        assert_eq!(part.filename(), Some("greeting.txt"));
        assert_eq!(part.content_type(), Some("text/plain"));
        assert_eq!(part.data().as_ref(), b"hello");
    }

    #[test]
    fn part_from_sniffed_source() {
        let source = FileSource::from(
            InMemoryFile::new("doc", b"%PDF-1.4 rest of document".as_slice())
                .with_field_name("attachment"),
        );
        let part = Part::from_source(&source).expect("part");
        assert_eq!(part.name(), "attachment");
        assert_eq!(part.content_type(), Some("application/pdf"));
        assert_eq!(part.data().as_ref(), b"%PDF-1.4 rest of document");
    }

    #[test]
    fn part_from_missing_file() {
        let source = FileSource::from(LocalFile::new("/no/such/upload.bin"));
        assert!(Part::from_source(&source).is_err());
    }

    #[test]
    fn form_empty() {
        let form = Form::new();
        assert!(form.parts().is_empty());
        assert!(form.boundary().starts_with("----ErrandBoundary"));
    }

    #[test]
    fn boundaries_differ() {
        assert_ne!(Form::new().boundary(), Form::new().boundary());
    }

    #[test]
    fn form_content_type() {
        let form = Form::with_boundary("test-boundary");
        assert_eq!(
            form.content_type(),
            "multipart/form-data; boundary=test-boundary"
        );
    }

    #[test]
    fn form_encode() {
        let source = FileSource::from(
            InMemoryFile::new("greeting.txt", "hello").with_content_type("text/plain"),
        );
        let form = Form::with_boundary("b0")
            .part(Part::from_source(&source).expect("part"))
            .field("name", "value");

        let (content_type, body) = form.into_body();
        assert_eq!(content_type, "multipart/form-data; boundary=b0");
        assert_eq!(
            String::from_utf8_lossy(&body),
            "--b0\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"greeting.txt\"\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             hello\r\n\
             --b0\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\
             \r\n\
             value\r\n\
             --b0--\r\n"
        );
    }

    #[test]
    fn quotes_are_escaped() {
        let form = Form::with_boundary("b1")
            .part(Part::new("we\"ird", "x").with_filename("a\\b.txt"));
        let (_, body) = form.into_body();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains(r#"name="we\"ird"; filename="a\\b.txt""#));
    }
}
