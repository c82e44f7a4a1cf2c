//! Query-string escaping helpers.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode_byte, utf8_percent_encode};

use crate::{Error, Result};

/// Characters escaped in a query component: everything except `A-Z a-z 0-9 - _ . ~`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a string for use inside a URL query, encoding spaces as `+`.
///
/// ```
/// assert_eq!(errand_core::url_encode("a b&c=d/é"), "a+b%26c%3Dd%2F%C3%A9");
/// ```
#[must_use]
pub fn url_encode(input: &str) -> String {
    input
        .split(' ')
        .map(|chunk| utf8_percent_encode(chunk, QUERY_COMPONENT).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Reverse of [`url_encode`]: `+` becomes a space and `%XX` escapes are decoded.
///
/// # Errors
///
/// Returns [`Error::InvalidEscape`] on a `%` not followed by two hex digits,
/// or when the decoded bytes are not UTF-8.
pub fn url_decode(input: &str) -> Result<String> {
    check_escapes(input)?;
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|err| Error::InvalidEscape(err.to_string()))
}

/// Percent-encode every byte of the string, unreserved characters included.
///
/// ```
/// assert_eq!(errand_core::url_encode_fully("ab"), "%61%62");
/// ```
#[must_use]
pub fn url_encode_fully(input: &str) -> String {
    input.bytes().map(percent_encode_byte).collect()
}

fn check_escapes(input: &str) -> Result<()> {
    let bytes = input.as_bytes();
    for (index, _) in input.match_indices('%') {
        let valid = bytes
            .get(index + 1..index + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let end = (index + 3).min(input.len());
            let escape = input.get(index..end).unwrap_or("%");
            return Err(Error::InvalidEscape(format!("{escape:?}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_unreserved() {
        assert_eq!(url_encode("Az09-_.~"), "Az09-_.~");
        assert_eq!(url_encode("hello world"), "hello+world");
        assert_eq!(url_encode("a+b"), "a%2Bb");
        assert_eq!(url_encode(""), "");
    }

    #[test]
    fn decode() {
        assert_eq!(url_decode("hello+world").expect("decode"), "hello world");
        assert_eq!(url_decode("a%2Bb%20c").expect("decode"), "a+b c");
        assert_eq!(url_decode("%C3%A9").expect("decode"), "é");
    }

    #[test]
    fn decode_rejects_bad_escapes() {
        for input in ["%", "%4", "%zz", "abc%g1", "%%41"] {
            let err = url_decode(input).expect_err(input);
            assert!(matches!(err, Error::InvalidEscape(_)), "{input}: {err}");
        }
        assert!(url_decode("%FF").is_err());
    }

    #[test]
    fn encode_fully() {
        assert_eq!(url_encode_fully("a b"), "%61%20%62");
        assert_eq!(url_encode_fully("é"), "%C3%A9");
        assert_eq!(
            url_decode(&url_encode_fully("any text~")).expect("decode"),
            "any text~"
        );
    }
}
