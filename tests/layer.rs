#![cfg(feature = "signed")]

// End-to-end tests using an Axum `Router` layered with `SessionLoaderLayer`. Handlers write and
// clear sessions through the store; the layer verifies them on the way in.
mod common;

use std::sync::Arc;

use axum::{Router, body::Body, extract::Request, routing::get};
use chunked_cookie_session::{
    CookieStore, Key, SessionLoaderLayer, SessionToken, SessionValue, SignedEncoder,
};
use common::Browser;
use http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use tower::ServiceExt as _;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    name: String,
}

fn app(encoder: SignedEncoder) -> Router {
    let store = Arc::new(
        CookieStore::new(
            common::fixed_options(common::pomerium_options()),
            Some(encoder.clone()),
        )
        .expect("store builds"),
    );
    let loader = store.loader();
    let login_store = store.clone();
    let logout_store = store;

    Router::new()
        .route(
            "/login",
            get(move |headers: HeaderMap| {
                let store = login_store.clone();
                async move {
                    let user = User {
                        name: "alice".into(),
                    };
                    let mut set_cookies = HeaderMap::new();
                    store
                        .save_session(&mut set_cookies, &headers, SessionValue::typed(&user))
                        .expect("session saves");
                    (set_cookies, "ok")
                }
            }),
        )
        .route(
            "/logout",
            get(move |headers: HeaderMap| {
                let store = logout_store.clone();
                async move {
                    let mut set_cookies = HeaderMap::new();
                    store
                        .clear_session(&mut set_cookies, &headers)
                        .expect("session clears");
                    (set_cookies, "bye")
                }
            }),
        )
        .route(
            "/whoami",
            get(move |req: Request| {
                let encoder = encoder.clone();
                async move {
                    req.extensions()
                        .get::<SessionToken>()
                        .map(|token| {
                            token
                                .decode::<User, _>(&encoder)
                                .expect("verified token decodes")
                                .name
                        })
                        .unwrap_or_else(|| "anonymous".to_string())
                }
            }),
        )
        .layer(SessionLoaderLayer::new(loader))
}

async fn get_path(app: &Router, browser: &mut Browser, path: &str) -> String {
    let mut builder = http::Request::builder().uri(path);
    let cookie = browser.cookie_header();
    if !cookie.is_empty() {
        builder = builder.header(header::COOKIE, cookie);
    }
    let req = builder
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app
        .clone()
        .oneshot(req)
        .await
        .expect("service call succeeds");
    browser.apply(res.headers());
    common::body_string(res.into_body()).await
}

#[tokio::test]
async fn login_whoami_logout() {
    // Exercise: log in, ask who we are, log out, ask again.
    // Expectation: the layer exposes the verified session only while the cookie is present.
    let app = app(SignedEncoder::new(Key::generate()));
    let mut browser = Browser::new();

    assert_eq!(get_path(&app, &mut browser, "/whoami").await, "anonymous");
    assert_eq!(get_path(&app, &mut browser, "/login").await, "ok");
    assert_eq!(browser.names(), ["_pomerium"]);
    assert_eq!(get_path(&app, &mut browser, "/whoami").await, "alice");
    assert_eq!(get_path(&app, &mut browser, "/logout").await, "bye");
    assert!(browser.names().is_empty());
    assert_eq!(get_path(&app, &mut browser, "/whoami").await, "anonymous");
}

#[tokio::test]
async fn session_from_other_key_is_ignored() {
    // Exercise: a session issued by one deployment is presented to another with a new key.
    // Expectation: verification fails, so no `SessionToken` reaches the handler.
    let issuer = app(SignedEncoder::new(Key::generate()));
    let verifier = app(SignedEncoder::new(Key::generate()));
    let mut browser = Browser::new();

    assert_eq!(get_path(&issuer, &mut browser, "/login").await, "ok");
    assert_eq!(get_path(&issuer, &mut browser, "/whoami").await, "alice");
    assert_eq!(
        get_path(&verifier, &mut browser, "/whoami").await,
        "anonymous"
    );
}

#[tokio::test]
async fn bogus_cookie_is_anonymous() {
    // Exercise: the client sends a cookie with the session name but an unverifiable value.
    // Expectation: the request passes through without a session.
    let app = app(SignedEncoder::new(Key::generate()));

    let req = http::Request::builder()
        .uri("/whoami")
        .header(header::COOKIE, "_pomerium=bogus")
        .body(Body::empty())
        .expect("request builds successfully");
    let res = app.oneshot(req).await.expect("service call succeeds");

    assert_eq!(common::body_string(res.into_body()).await, "anonymous");
}
