//!
//! Verification and decoding of Facebook
//! [signed requests](https://developers.facebook.com/docs/games/gamesonfacebook/login#parsingsr).
//!
//! A signed request is the string `<signature>.<payload>`, where both segments are base64url
//! encoded, `payload` is a JSON object, and `signature` is the HMAC-SHA256 of the *encoded*
//! payload text keyed with the app secret.
//!

use crate::helpers::{
    base64_url_decode, base64_url_encode, deserialize_option_or_none, seconds_to_utc,
};
use crate::{AppSecret, PageId, UserId};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use oauth2::{AccessToken, AuthorizationCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;
use sha2::Sha256;
use thiserror::Error;


/// The only signature algorithm Facebook uses for signed requests.
pub const SIGNED_REQUEST_ALGORITHM: &str = "HMAC-SHA256";

const ALGORITHM_KEY: &str = "algorithm";

type HmacSha256 = Hmac<Sha256>;

/// Error validating or decoding a signed request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignedRequestError {
    /// No signed request was supplied where one was required.
    #[error("Not a signed request")]
    MissingSignedRequest,
    /// The signed request is structurally invalid: wrong segment count, invalid base64url, a
    /// payload that is not a JSON object, or a missing `algorithm` field.
    #[error("Malformed signed request: {0}")]
    Malformed(String),
    /// The payload names a signature algorithm other than `HMAC-SHA256`.
    #[error("Unknown algorithm `{0}`. Expected HMAC-SHA256")]
    UnsupportedAlgorithm(String),
    /// The signature does not match the payload and app secret.
    #[error("Signed request signature mismatch")]
    SignatureMismatch,
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
}

new_secret_type![
    /// Raw signed request, as posted by Facebook in the `signed_request` form field.
    ///
    /// The value embeds the user's OAuth token, so it is treated as a secret.
    #[derive(Clone, Deserialize, Serialize)]
    SignedRequest(String)
    impl {
        /// Encodes and signs `payload` with the given app secret.
        ///
        /// An `algorithm` field of `HMAC-SHA256` is added unless `payload` already carries one.
        /// This mirrors what Facebook produces and is mainly useful for fixtures and tests.
        pub fn encode(
            payload: &Map<String, Value>,
            app_secret: &AppSecret,
        ) -> Result<Self, SignedRequestError> {
            let mut payload = payload.clone();
            payload
                .entry(ALGORITHM_KEY)
                .or_insert_with(|| Value::String(SIGNED_REQUEST_ALGORITHM.to_string()));

            let payload_json = serde_json::to_vec(&payload).map_err(|err| {
                SignedRequestError::Other(format!("failed to serialize payload: {}", err))
            })?;
            let encoded_payload = base64_url_encode(payload_json);
            let signature = sign(encoded_payload.as_bytes(), app_secret)?;

            Ok(SignedRequest::new(format!(
                "{}.{}",
                base64_url_encode(signature),
                encoded_payload
            )))
        }

        /// Verifies the signature of this signed request. See [`validate`].
        pub fn validate(&self, app_secret: &AppSecret) -> Result<bool, SignedRequestError> {
            validate(Some(self.secret()), app_secret)
        }

        /// Decodes the payload of this signed request without verifying it. See [`decode`].
        pub fn decode(&self) -> Result<DecodedPayload, SignedRequestError> {
            decode(Some(self.secret()))
        }

        /// Verifies and then decodes this signed request. See [`verified_payload`].
        pub fn verified_payload(
            &self,
            app_secret: &AppSecret,
        ) -> Result<DecodedPayload, SignedRequestError> {
            verified_payload(Some(self.secret()), app_secret)
        }
    }
];

/// Verifies the signature of a signed request.
///
/// Returns `Ok(true)` if the signature matches the payload under `app_secret` and `Ok(false)` if
/// it does not. Errors are reserved for requests that cannot be checked at all:
///
/// * [`SignedRequestError::MissingSignedRequest`] if `signed_request` is absent or empty;
/// * [`SignedRequestError::Malformed`] if it is not two base64url segments wrapping a JSON object
///   with an `algorithm` field;
/// * [`SignedRequestError::UnsupportedAlgorithm`] if `algorithm` is not `HMAC-SHA256`
///   (case-insensitive), regardless of whether the signature would match.
///
/// The signature comparison runs in constant time.
pub fn validate(
    signed_request: Option<&str>,
    app_secret: &AppSecret,
) -> Result<bool, SignedRequestError> {
    let (encoded_signature, encoded_payload) = split(signed_request)?;

    let signature = base64_url_decode(encoded_signature).map_err(|err| {
        SignedRequestError::Malformed(format!("invalid base64url signature encoding: {:?}", err))
    })?;
    let payload = decode_payload(encoded_payload)?;
    check_algorithm(&payload)?;

    // NB: Facebook signs the base64url payload text, not the decoded JSON bytes.
    let mut mac = new_mac(app_secret)?;
    mac.update(encoded_payload.as_bytes());
    let valid = mac.verify_slice(&signature).is_ok();

    if !valid {
        log::debug!("signed request signature does not match payload");
    }
    Ok(valid)
}

/// Decodes the payload of a signed request *without* verifying its signature.
///
/// Callers must [`validate`] first if authenticity matters. The `algorithm` field is removed
/// from the returned payload.
pub fn decode(signed_request: Option<&str>) -> Result<DecodedPayload, SignedRequestError> {
    let (_, encoded_payload) = split(signed_request)?;

    let mut payload = decode_payload(encoded_payload)?;
    payload.remove(ALGORITHM_KEY);

    Ok(DecodedPayload(payload))
}

/// Verifies a signed request and returns its decoded payload.
///
/// Unlike [`validate`], a signature mismatch is reported as
/// [`SignedRequestError::SignatureMismatch`].
pub fn verified_payload(
    signed_request: Option<&str>,
    app_secret: &AppSecret,
) -> Result<DecodedPayload, SignedRequestError> {
    if validate(signed_request, app_secret)? {
        decode(signed_request)
    } else {
        Err(SignedRequestError::SignatureMismatch)
    }
}

fn split(signed_request: Option<&str>) -> Result<(&str, &str), SignedRequestError> {
    let raw = signed_request
        .filter(|raw| !raw.is_empty())
        .ok_or(SignedRequestError::MissingSignedRequest)?;

    // NB: We avoid including the raw value in the error output to avoid clients potentially
    // logging the embedded OAuth token.
    match raw.split_once('.') {
        Some((signature, payload)) if !payload.contains('.') => Ok((signature, payload)),
        _ => Err(SignedRequestError::Malformed(format!(
            "found {} segments (expected 2)",
            raw.split('.').count()
        ))),
    }
}

fn decode_payload(encoded_payload: &str) -> Result<Map<String, Value>, SignedRequestError> {
    let raw_payload = base64_url_decode(encoded_payload).map_err(|err| {
        SignedRequestError::Malformed(format!("invalid base64url payload encoding: {:?}", err))
    })?;

    match serde_json::from_slice::<Value>(&raw_payload) {
        Ok(Value::Object(payload)) => Ok(payload),
        Ok(_) => Err(SignedRequestError::Malformed(
            "payload is not a JSON object".to_string(),
        )),
        Err(err) => Err(SignedRequestError::Malformed(format!(
            "failed to parse payload JSON: {}",
            err
        ))),
    }
}

fn check_algorithm(payload: &Map<String, Value>) -> Result<(), SignedRequestError> {
    match payload.get(ALGORITHM_KEY) {
        Some(Value::String(alg)) if alg.eq_ignore_ascii_case(SIGNED_REQUEST_ALGORITHM) => Ok(()),
        Some(Value::String(alg)) => Err(SignedRequestError::UnsupportedAlgorithm(alg.clone())),
        Some(_) => Err(SignedRequestError::Malformed(
            "`algorithm` must be a string".to_string(),
        )),
        None => Err(SignedRequestError::Malformed(
            "missing `algorithm` field".to_string(),
        )),
    }
}

fn new_mac(app_secret: &AppSecret) -> Result<HmacSha256, SignedRequestError> {
    HmacSha256::new_from_slice(app_secret.secret().as_bytes())
        .map_err(|e| SignedRequestError::Other(format!("Could not create key: {}", e)))
}

fn sign(message: &[u8], app_secret: &AppSecret) -> Result<Vec<u8>, SignedRequestError> {
    let mut mac = new_mac(app_secret)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().as_slice().to_vec())
}

/// Payload of a signed request, minus its `algorithm` field.
///
/// Every field is optional. Accessors return `None` both when a field is absent and when it has
/// an unexpected type; absence never means zero or `false`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DecodedPayload(Map<String, Value>);
impl DecodedPayload {
    /// Returns the raw payload fields.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the payload and returns its raw fields.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns the raw value of the given top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// App-scoped ID of the user, present once the user has authorized the app.
    pub fn user_id(&self) -> Option<UserId> {
        self.field("user_id")
    }

    /// OAuth token of the user, present once the user has authorized the app.
    pub fn oauth_token(&self) -> Option<AccessToken> {
        self.field::<String>("oauth_token").map(AccessToken::new)
    }

    /// Authorization code that can be exchanged for an access token.
    pub fn code(&self) -> Option<AuthorizationCode> {
        self.field::<String>("code").map(AuthorizationCode::new)
    }

    /// Instant at which [`oauth_token`](Self::oauth_token) expires.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.timestamp("expires")
    }

    /// Instant at which Facebook issued the signed request.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("issued_at")
    }

    /// Page context, present when the app is loaded in a page tab.
    pub fn page(&self) -> Option<PageContext> {
        self.field("page")
    }

    /// Whether the current user likes the page hosting the page tab.
    pub fn page_liked(&self) -> Option<bool> {
        self.page().and_then(|page| page.liked)
    }

    /// Locale, country, and age range of the current user.
    pub fn user(&self) -> Option<UserContext> {
        self.field("user")
    }

    /// The `app_data` query parameter passed to the page tab, if any.
    pub fn app_data(&self) -> Option<String> {
        self.field("app_data")
    }

    fn field<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.0
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.0.get(key) {
            Some(Value::Number(seconds)) => seconds_to_utc(seconds),
            _ => None,
        }
    }
}
impl From<Map<String, Value>> for DecodedPayload {
    fn from(payload: Map<String, Value>) -> Self {
        DecodedPayload(payload)
    }
}
impl From<DecodedPayload> for Map<String, Value> {
    fn from(payload: DecodedPayload) -> Self {
        payload.0
    }
}

/// The `page` object of a signed request.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct PageContext {
    /// ID of the page hosting the page tab.
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub id: Option<PageId>,
    /// Whether the current user likes the page.
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub liked: Option<bool>,
    /// Whether the current user administers the page.
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub admin: Option<bool>,
}

/// The `user` object of a signed request.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct UserContext {
    /// Two-letter country code (e.g., `hu`).
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub country: Option<String>,
    /// Locale (e.g., `en_US`).
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub locale: Option<String>,
    /// Age bracket.
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub age: Option<AgeRange>,
}

/// Age bracket of the current user.
#[skip_serializing_none]
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct AgeRange {
    /// Lower bound, inclusive.
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub min: Option<u32>,
    /// Upper bound, inclusive.
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    pub max: Option<u32>,
}
