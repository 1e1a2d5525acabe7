//! Chunked, integrity-verified session tokens stored in browser cookies.
//!
//! A [`CookieStore`] keeps an opaque session token in the client's cookie jar instead of on the
//! server. Typed session values go through a pluggable [`Marshaler`] that produces a
//! tamper-evident token; tokens too large for one cookie are split across `<name>`, `<name>1`,
//! `<name>2`, ... and joined back on read. Every load is verified with an [`Unmarshaler`] before
//! the token is handed back.
//!
//! ```no_run
//! # #[cfg(feature = "signed")]
//! # fn demo() -> chunked_cookie_session::Result<()> {
//! use std::sync::Arc;
//!
//! use chunked_cookie_session::{
//!     CookieOptions, CookieStore, Key, LiveOptions, SessionValue, SignedEncoder, Unmarshaler,
//! };
//! use http::HeaderMap;
//!
//! let options = Arc::new(LiveOptions::new(CookieOptions::default().with_name("_pomerium")));
//! let encoder = SignedEncoder::new(Key::generate());
//! let store = CookieStore::new(options.clone(), Some(encoder.clone()))?;
//!
//! let mut response = HeaderMap::new();
//! store.save_session(&mut response, &HeaderMap::new(), SessionValue::typed("alice"))?;
//!
//! # let request = HeaderMap::new();
//! let token = store.load_session(&request)?;
//! let user: String = encoder.unmarshal(&token).expect("verified token decodes");
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//! Raw values ([`SessionValue::RawText`], [`SessionValue::RawBytes`]) bypass the encoder. They
//! are written as-is and carry **no tamper resistance**; loading them normally fails
//! verification. Use them only for data that is verified by other means.

mod chunk;
mod config;
mod encoder;
mod error;
pub mod format;
pub mod layer;
mod store;

pub use tower_cookies::cookie::SameSite;

#[cfg(any(feature = "signed", feature = "private"))]
pub use tower_cookies::Key;

pub use crate::chunk::{MAX_CHUNK_BYTES, MAX_CHUNKS};
pub use crate::config::{COOKIE_PATH, CookieOptions, LiveOptions, OptionsSource};
pub use crate::encoder::{Marshaler, Unmarshaler};
pub use crate::error::{BoxError, Error, ErrorKind, Result};
pub use crate::layer::{SessionLoaderLayer, SessionToken};
pub use crate::store::{CookieLoader, CookieStore, SessionValue};

#[cfg(feature = "signed")]
pub use crate::encoder::SignedEncoder;

#[cfg(feature = "private")]
pub use crate::encoder::PrivateEncoder;
