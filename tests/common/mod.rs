#![allow(dead_code)]

// Shared helpers for integration tests.
//
// These helpers intentionally use `tower_cookies::Cookie` parsing/encoding to match what the
// store emits in `Set-Cookie` and what browsers send back in `Cookie`.
use std::sync::Arc;

use axum::body::Body;
use chunked_cookie_session::{CookieOptions, OptionsSource};
use http::{HeaderMap, HeaderValue, header};
use http_body_util::BodyExt as _;
use time::{Duration, OffsetDateTime};
use tower_cookies::{Cookie, cookie::CookieJar};

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn pomerium_options() -> CookieOptions {
    CookieOptions::default()
        .with_name("_pomerium")
        .with_secure(true)
        .with_http_only(true)
        .with_domain("pomerium.io")
        .with_expire(Duration::seconds(10))
}

pub fn fixed_options(options: CookieOptions) -> Arc<dyn OptionsSource> {
    Arc::new(move || options.clone())
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    // Parse every `Set-Cookie` header into a `Cookie` structure, in emission order.
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| {
            let value = value.to_str().expect("set-cookie header is valid utf-8");
            Cookie::parse_encoded(value.to_owned()).expect("set-cookie parses successfully")
        })
        .collect()
}

pub fn wire_pair_lengths(headers: &HeaderMap) -> Vec<usize> {
    // Byte length of each `Set-Cookie` `name=value` pair exactly as sent, before any attribute.
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| {
            let value = value.to_str().expect("set-cookie header is valid utf-8");
            value.split(';').next().unwrap_or_default().len()
        })
        .collect()
}

/// Minimal browser cookie jar: applies `Set-Cookie` headers and renders a `Cookie` header.
#[derive(Debug, Default)]
pub struct Browser {
    jar: CookieJar,
}

impl Browser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, response: &HeaderMap) {
        let now = OffsetDateTime::now_utc();
        for cookie in set_cookies(response) {
            let expired = cookie.expires_datetime().is_some_and(|at| at <= now);
            if expired {
                self.jar.remove(Cookie::from(cookie.name().to_owned()));
            } else {
                self.jar.add(cookie);
            }
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jar.iter().map(|c| c.name().to_owned()).collect();
        names.sort();
        names
    }

    pub fn request(&self) -> HeaderMap {
        let pairs: Vec<String> = self
            .jar
            .iter()
            .map(|cookie| cookie.stripped().encoded().to_string())
            .collect();

        let mut headers = HeaderMap::new();
        if !pairs.is_empty() {
            headers.insert(
                header::COOKIE,
                HeaderValue::try_from(pairs.join("; ")).expect("cookie header is valid"),
            );
        }
        headers
    }

    pub fn cookie_header(&self) -> String {
        self.request()
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    }
}
