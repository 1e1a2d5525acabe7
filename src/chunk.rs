//! Splitting session tokens across cookies and joining them back.
//!
//! A token that fits in one cookie is stored under the base name. Longer tokens continue in
//! `<name>1`, `<name>2`, ... and are read back in index order until the first missing index.
//! There is no count or terminator cookie: a gap ends the token, so a dropped middle chunk
//! yields a truncated token that then fails verification.
//!
//! Chunks are cut from the percent-encoded token, so the size bound holds for the bytes that
//! actually go on the wire. Each chunk decodes on its own when the request is parsed.

use http::{HeaderMap, header};
use tower_cookies::{Cookie, cookie::CookieJar};

use crate::error::{Error, Result};

/// Upper bound on a chunk cookie's encoded `name=value` pair, leaving room for the attributes
/// under the ~4096 byte limit browsers apply to a whole cookie.
pub const MAX_CHUNK_BYTES: usize = 4000;

/// Upper bound on the number of cookies one token may occupy.
pub const MAX_CHUNKS: usize = 8;

/// Name of the cookie holding chunk `index` of the token stored under `base_name`.
pub fn chunk_name(base_name: &str, index: usize) -> String {
    if index == 0 {
        base_name.to_owned()
    } else {
        format!("{base_name}{index}")
    }
}

/// Split `token` into `(cookie name, encoded cookie value)` pairs whose `name=value` form is at
/// most `max_cookie` bytes.
///
/// Values are already percent-encoded and must be written without encoding them again. A chunk
/// never ends inside a `%XX` escape or between the escapes of one UTF-8 code point.
pub fn split(token: &str, base_name: &str, max_cookie: usize) -> Result<Vec<(String, String)>> {
    let encoded = encode_value(token);
    let bytes = encoded.as_bytes();

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let name = chunk_name(base_name, chunks.len());
        let budget = max_cookie.saturating_sub(name.len() + 1);
        let mut end = start;
        while end < bytes.len() {
            let unit = unit_len(&bytes[end..]);
            // Always make progress, even when one code point is wider than the budget.
            if end > start && end + unit - start > budget {
                break;
            }
            end += unit;
        }
        chunks.push((name, encoded[start..end].to_owned()));
        if end == bytes.len() {
            break;
        }
        start = end;
    }

    if chunks.len() > MAX_CHUNKS {
        return Err(Error::TooManyChunks {
            chunks: chunks.len(),
            max: MAX_CHUNKS,
        });
    }

    Ok(chunks)
}

/// Percent-encode `token` the way the cookie crate encodes values, so that
/// `Cookie::split_parse_encoded` decodes it back.
fn encode_value(token: &str) -> String {
    let encoded = Cookie::new("", token).encoded().to_string();
    match encoded.strip_prefix('=') {
        Some(value) => value.to_owned(),
        None => encoded,
    }
}

/// Length of the encoded code point at the start of `rest`: one plain byte, or a `%XX` escape
/// followed by the escapes of its UTF-8 continuation bytes.
fn unit_len(rest: &[u8]) -> usize {
    if rest.first() != Some(&b'%') {
        return 1;
    }
    let mut len = 3;
    while rest.get(len) == Some(&b'%')
        && escaped_byte(rest.get(len + 1..len + 3)).is_some_and(|byte| byte & 0xC0 == 0x80)
    {
        len += 3;
    }
    len.min(rest.len())
}

fn escaped_byte(hex: Option<&[u8]>) -> Option<u8> {
    let hex = std::str::from_utf8(hex?).ok()?;
    u8::from_str_radix(hex, 16).ok()
}

/// Reassemble the token stored under `base_name`.
pub fn join(jar: &CookieJar, base_name: &str) -> Result<String> {
    let Some(first) = jar.get(base_name) else {
        return Err(Error::NotFound {
            name: base_name.to_owned(),
        });
    };

    let mut token = first.value().to_owned();
    for index in 1..MAX_CHUNKS {
        match jar.get(&chunk_name(base_name, index)) {
            Some(cookie) => token.push_str(cookie.value()),
            None => break,
        }
    }
    Ok(token)
}

/// Names of the contiguous chunk cookies for `base_name` present in `jar`.
pub fn chunk_names_in(jar: &CookieJar, base_name: &str) -> Vec<String> {
    (0..MAX_CHUNKS)
        .map(|index| chunk_name(base_name, index))
        .take_while(|name| jar.get(name).is_some())
        .collect()
}

/// Collect the cookies a client sent in its `Cookie` headers.
///
/// Values are percent-decoded; pairs that fail to parse are skipped.
pub fn request_jar(headers: &HeaderMap) -> CookieJar {
    let mut jar = CookieJar::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            tracing::trace!("skipping non-ascii cookie header");
            continue;
        };
        for cookie in Cookie::split_parse_encoded(value.to_owned()).flatten() {
            jar.add_original(cookie);
        }
    }
    jar
}
