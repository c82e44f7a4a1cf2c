//! Content type sniffing from leading bytes.
//!
//! Implements the WHATWG MIME sniffing table for the types an upload is
//! likely to carry: markup, PDF/PostScript, images, audio/video, fonts,
//! archives, and plain text versus binary.

/// Only this many leading bytes are inspected.
pub const SNIFF_LEN: usize = 512;

/// Fallback for binary content that matches no signature.
pub const OCTET_STREAM: &str = "application/octet-stream";

const TEXT_UTF8: &str = "text/plain; charset=utf-8";
const HTML_UTF8: &str = "text/html; charset=utf-8";

enum Signature {
    /// Exact prefix match.
    Exact(&'static [u8], &'static str),
    /// Prefix match after AND-ing the data with a mask.
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_whitespace: bool,
        content_type: &'static str,
    },
    /// Case-insensitive HTML tag followed by a space or `>`.
    Html(&'static [u8]),
    /// ISO base media file with an `mp4` brand.
    Mp4,
    /// No binary control bytes.
    Text,
}

const SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_whitespace: true,
        content_type: "text/xml; charset=utf-8",
    },
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFE\xFF\x00\x00",
        skip_whitespace: false,
        content_type: "text/plain; charset=utf-16be",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFF\xFE\x00\x00",
        skip_whitespace: false,
        content_type: "text/plain; charset=utf-16le",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pattern: b"\xEF\xBB\xBF\x00",
        skip_whitespace: false,
        content_type: TEXT_UTF8,
    },
    // Images
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        skip_whitespace: false,
        content_type: "image/webp",
    },
    Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio and video
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        skip_whitespace: false,
        content_type: "audio/aiff",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF",
        pattern: b"ID3",
        skip_whitespace: false,
        content_type: "audio/mpeg",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"OggS\x00",
        skip_whitespace: false,
        content_type: "application/ogg",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"MThd\x00\x00\x00\x06",
        skip_whitespace: false,
        content_type: "audio/midi",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        skip_whitespace: false,
        content_type: "video/avi",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        skip_whitespace: false,
        content_type: "audio/wave",
    },
    Signature::Mp4,
    Signature::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts
    Signature::Exact(b"\x00\x01\x00\x00", "font/ttf"),
    Signature::Exact(b"OTTO", "font/otf"),
    Signature::Exact(b"ttcf", "font/collection"),
    Signature::Exact(b"wOFF", "font/woff"),
    Signature::Exact(b"wOF2", "font/woff2"),
    // Archives
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Exact(b"\x00\x61\x73\x6D", "application/wasm"),
    Signature::Text,
];

/// Detect the content type of `data` from at most its first
/// [`SNIFF_LEN`] bytes.
///
/// Always returns a valid MIME type, falling back to
/// `application/octet-stream`.
///
/// # Example
///
/// ```
/// use errand_core::detect_content_type;
///
/// assert_eq!(detect_content_type(b"%PDF-1.4\n..."), "application/pdf");
/// assert_eq!(detect_content_type(b"hello"), "text/plain; charset=utf-8");
/// ```
#[must_use]
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = data.get(..SNIFF_LEN).unwrap_or(data);
    let first_non_ws = data
        .iter()
        .position(|b| !is_whitespace(*b))
        .unwrap_or(data.len());

    SIGNATURES
        .iter()
        .find_map(|signature| signature.matches(data, first_non_ws))
        .unwrap_or(OCTET_STREAM)
}

const fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

const fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Self::Exact(pattern, content_type) => {
                data.starts_with(pattern).then_some(*content_type)
            }
            Self::Masked {
                mask,
                pattern,
                skip_whitespace,
                content_type,
            } => {
                let data = if *skip_whitespace {
                    data.get(first_non_ws..).unwrap_or_default()
                } else {
                    data
                };
                let head = data.get(..pattern.len())?;
                head.iter()
                    .zip(mask.iter())
                    .zip(pattern.iter())
                    .all(|((d, m), p)| d & m == *p)
                    .then_some(*content_type)
            }
            Self::Html(pattern) => {
                let data = data.get(first_non_ws..).unwrap_or_default();
                let head = data.get(..pattern.len())?;
                let same = head.iter().zip(pattern.iter()).all(|(d, p)| {
                    if p.is_ascii_uppercase() {
                        d.to_ascii_uppercase() == *p
                    } else {
                        d == p
                    }
                });
                // The tag must be terminated.
                let terminated = matches!(data.get(pattern.len()).copied(), Some(b' ' | b'>'));
                (same && terminated).then_some(HTML_UTF8)
            }
            Self::Mp4 => is_mp4(data).then_some("video/mp4"),
            Self::Text => data
                .get(first_non_ws..)
                .unwrap_or_default()
                .iter()
                .all(|b| !is_binary(*b))
                .then_some(TEXT_UTF8),
        }
    }
}

fn is_mp4(data: &[u8]) -> bool {
    let Some(size) = data.get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) else {
        return false;
    };
    let Ok(box_size) = usize::try_from(u32::from_be_bytes(size)) else {
        return false;
    };
    if data.len() < 12 || data.len() < box_size || box_size % 4 != 0 {
        return false;
    }
    if data.get(4..8) != Some(b"ftyp".as_slice()) {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|start| *start != 12)
        .any(|start| data.get(start..start + 3) == Some(b"mp4".as_slice()))
}
