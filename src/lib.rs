#![warn(missing_docs)]
#![allow(clippy::type_complexity)]
#![cfg_attr(test, allow(clippy::cognitive_complexity))]
//!
//! [Facebook](https://developers.facebook.com/docs/) canvas and page tab app support.
//!
//! This crate verifies and decodes the
//! [signed requests](https://developers.facebook.com/docs/games/gamesonfacebook/login#parsingsr)
//! Facebook posts to canvas and page tab apps, and wraps the OAuth and
//! [Graph API](https://developers.facebook.com/docs/graph-api) calls such apps typically need:
//! exchanging authorization codes for access tokens, reading the current user's data, managing
//! photo albums, sending app notifications, and counting link engagement.
//!
//! # Signed requests
//!
//! A signed request is the string `<signature>.<payload>`, where `payload` is a base64url-encoded
//! JSON object and `signature` is its HMAC-SHA256 keyed with the app secret. Use
//! [`signed_request::validate`] to check the signature and [`signed_request::decode`] to read the
//! payload:
//!
//! ```rust
//! use fb_canvas::{signed_request, AppSecret, SignedRequest};
//! use serde_json::json;
//!
//! # fn err_wrapper() -> Result<(), anyhow::Error> {
//! let app_secret = AppSecret::new("s3cret".to_string());
//! # let raw = SignedRequest::encode(
//! #     json!({"user_id": "123", "page": {"liked": true, "id": "99", "admin": false}})
//! #         .as_object()
//! #         .unwrap(),
//! #     &app_secret,
//! # )?
//! # .into_secret();
//!
//! // `raw` is the `signed_request` form field posted by Facebook.
//! if signed_request::validate(Some(&raw), &app_secret)? {
//!     let payload = signed_request::decode(Some(&raw))?;
//!     assert_eq!(payload.page_liked(), Some(true));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Host integration
//!
//! [`FacebookService`] ties signed requests and the Graph API to the host web framework through
//! three narrow traits: a [`SessionStore`], a [`UrlGenerator`], and an [`EventDispatcher`].
//! Calling [`FacebookService::on_request`] before routing each request verifies any signed
//! request, emits the `fb.user_info` event, caches the user's access token and "page liked"
//! status in the session (emitting `fb.like`/`fb.unlike` when the status changes), and completes
//! the OAuth code exchange on the configured redirect route.
//!
//! # HTTP clients
//!
//! Every outbound call goes through an [`oauth2::SyncHttpClient`](SyncHttpClient). With the
//! default `reqwest-blocking` feature, a `reqwest::blocking::Client` can be used directly (it is
//! re-exported as [`reqwest`]). Any `Fn(HttpRequest) -> Result<HttpResponse, E>` closure also
//! works, which is convenient for tests.
//!
//! Requests are sent once, without retries. Configure timeouts on the HTTP client itself.
//!

pub use oauth2::{
    AccessToken, AuthUrl, AuthorizationCode, ClientId, CsrfToken, HttpClientError, HttpRequest,
    HttpResponse, RedirectUrl, Scope, SyncHttpClient, TokenUrl,
};

#[cfg(all(feature = "curl", not(target_arch = "wasm32")))]
pub use oauth2::{curl, CurlHttpClient};

#[cfg(feature = "reqwest-blocking")]
pub use oauth2::reqwest;

#[cfg(feature = "ureq")]
pub use oauth2::ureq;

#[macro_use]
mod macros;

mod config;
pub mod graph;
mod helpers;
pub mod host;
mod http_utils;
mod service;
pub mod signed_request;
mod types;

pub use crate::config::FacebookConfig;
pub use crate::graph::{
    AccessTokenResponse, Album, AppAccessTokenCache, GraphClient, GraphError, GraphErrorResponse,
    Notification, PhotoUpload, MAX_NOTIFICATION_LENGTH,
};
pub use crate::host::{
    EventDispatcher, FacebookEvent, InboundRequest, MemorySession, RecordingDispatcher,
    SessionStore, StaticUrlGenerator, UrlGenerationError, UrlGenerator,
};
pub use crate::service::{FacebookService, ServiceError};
pub use crate::signed_request::{
    AgeRange, DecodedPayload, PageContext, SignedRequest, SignedRequestError, UserContext,
    SIGNED_REQUEST_ALGORITHM,
};
pub use crate::types::{AlbumId, AppSecret, GraphUrl, PageId, RouteName, UserId};
