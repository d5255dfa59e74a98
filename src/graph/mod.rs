//!
//! Blocking client for the Facebook OAuth endpoints and the subset of the
//! [Graph API](https://developers.facebook.com/docs/graph-api) used by canvas and page tab apps.
//!
//! Each operation issues exactly one HTTP request through a caller-supplied [`SyncHttpClient`]
//! (or none, when served from a cache or rejected by local validation). Requests are never
//! retried and no timeouts are imposed; configure those on the underlying HTTP client.
//!

use crate::helpers::deserialize_option_or_none;
use crate::http_utils::{
    auth_bearer, check_content_type, form_urlencoded, MultipartForm, MIME_TYPE_FORM_URLENCODED,
    MIME_TYPE_JAVASCRIPT, MIME_TYPE_JSON, MIME_TYPE_OCTET_STREAM,
};
use crate::{
    AccessToken, AlbumId, AppSecret, AuthUrl, AuthorizationCode, ClientId, CsrfToken, GraphUrl,
    HttpRequest, HttpResponse, RedirectUrl, Scope, SyncHttpClient, TokenUrl, UserId,
};

use chrono::{DateTime, Utc};
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use http::method::Method;
use http::status::StatusCode;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr, PickFirst};
use thiserror::Error;
use url::Url;

use std::fmt::{Debug, Display, Formatter};
use std::path::Path;
use std::time::Duration;


/// Default Graph API base URL.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/";
/// Default OAuth dialog URL.
pub const DEFAULT_DIALOG_URL: &str = "https://www.facebook.com/dialog/oauth";
/// Default OAuth token endpoint URL.
pub const DEFAULT_TOKEN_URL: &str = "https://graph.facebook.com/oauth/access_token";

/// Maximum length of a notification template, in characters.
pub const MAX_NOTIFICATION_LENGTH: usize = 180;

const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";
const GRANT_TYPE_FB_EXCHANGE_TOKEN: &str = "fb_exchange_token";

///
/// Client for the Facebook OAuth and Graph API endpoints of a single app.
///
/// Endpoint URLs default to Facebook's production endpoints and can be overridden (e.g., to pin a
/// Graph API version or to point at a test double).
///
#[derive(Clone, Debug)]
pub struct GraphClient {
    app_id: ClientId,
    app_secret: AppSecret,
    graph_url: Option<GraphUrl>,
    dialog_url: Option<AuthUrl>,
    token_url: Option<TokenUrl>,
}
impl GraphClient {
    /// Creates a client for the given app.
    pub fn new(app_id: ClientId, app_secret: AppSecret) -> Self {
        Self {
            app_id,
            app_secret,
            graph_url: None,
            dialog_url: None,
            token_url: None,
        }
    }

    /// Overrides the Graph API base URL (default: [`DEFAULT_GRAPH_URL`]).
    pub fn set_graph_url(mut self, graph_url: Option<GraphUrl>) -> Self {
        self.graph_url = graph_url;
        self
    }

    /// Overrides the OAuth dialog URL (default: [`DEFAULT_DIALOG_URL`]).
    pub fn set_dialog_url(mut self, dialog_url: Option<AuthUrl>) -> Self {
        self.dialog_url = dialog_url;
        self
    }

    /// Overrides the OAuth token endpoint URL (default: [`DEFAULT_TOKEN_URL`]).
    pub fn set_token_url(mut self, token_url: Option<TokenUrl>) -> Self {
        self.token_url = token_url;
        self
    }

    /// Returns the app ID.
    pub fn app_id(&self) -> &ClientId {
        &self.app_id
    }

    ///
    /// Returns the URL of the OAuth dialog prompting the user to authorize the app.
    ///
    /// `scopes` are joined with commas. `state` is included only when provided.
    ///
    pub fn authorization_url(
        &self,
        redirect_url: &RedirectUrl,
        scopes: &[Scope],
        state: Option<&CsrfToken>,
    ) -> Result<Url, url::ParseError> {
        let mut url = match &self.dialog_url {
            Some(dialog_url) => dialog_url.url().clone(),
            None => Url::parse(DEFAULT_DIALOG_URL)?,
        };
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.app_id)
                .append_pair("redirect_uri", redirect_url.as_str())
                .append_pair(
                    "scope",
                    &scopes.iter().map(|scope| scope.as_str()).join(","),
                );
            if let Some(state) = state {
                query.append_pair("state", state.secret());
            }
        }
        Ok(url)
    }

    ///
    /// Returns the URL that exchanges an authorization code for an access token.
    ///
    /// # Security Warning
    ///
    /// The returned URL embeds the app secret. Do not log it or expose it to users.
    ///
    pub fn token_url(
        &self,
        redirect_url: &RedirectUrl,
        code: &AuthorizationCode,
    ) -> Result<Url, url::ParseError> {
        self.token_endpoint(&[
            ("client_id", self.app_id.as_str()),
            ("redirect_uri", redirect_url.as_str()),
            ("client_secret", self.app_secret.secret().as_str()),
            ("code", code.secret().as_str()),
        ])
    }

    /// Exchanges an authorization code for a user access token.
    ///
    /// Both the JSON response format and the legacy `access_token=...&expires=...` format are
    /// accepted.
    pub fn exchange_code<C>(
        &self,
        redirect_url: &RedirectUrl,
        code: &AuthorizationCode,
        http_client: &C,
    ) -> Result<AccessTokenResponse, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let url = self
            .token_url(redirect_url, code)
            .map_err(GraphError::UrlParse)?;
        log::debug!("exchanging authorization code for an access token");
        self.token_request(url, http_client)
    }

    /// Fetches the fields of the `/me` object for the given user access token.
    pub fn user_data<C>(
        &self,
        access_token: &AccessToken,
        http_client: &C,
    ) -> Result<Map<String, Value>, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let url = self.endpoint(&["me"])?;
        execute(
            http_client,
            graph_request(Method::GET, url, Some(access_token), None, Vec::new()),
        )
    }

    /// Returns the ID of the user's first album named exactly `name`.
    ///
    /// Only the first page of the user's albums is searched.
    pub fn album_id<C>(
        &self,
        access_token: &AccessToken,
        name: &str,
        http_client: &C,
    ) -> Result<Option<AlbumId>, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let url = self.endpoint(&["me", "albums"])?;
        let albums: GraphList<Album> = execute(
            http_client,
            graph_request(Method::GET, url, Some(access_token), None, Vec::new()),
        )?;

        Ok(albums
            .data
            .into_iter()
            .find(|album| album.name.as_deref() == Some(name))
            .map(|album| album.id))
    }

    /// Creates an album named `name` and returns its ID.
    pub fn create_album<C>(
        &self,
        access_token: &AccessToken,
        name: &str,
        http_client: &C,
    ) -> Result<AlbumId, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let url = self.endpoint(&["me", "albums"])?;
        let created: CreatedObject<AlbumId> = execute(
            http_client,
            graph_request(
                Method::POST,
                url,
                Some(access_token),
                Some(MIME_TYPE_FORM_URLENCODED),
                form_urlencoded([("name", name)]),
            ),
        )?;
        log::debug!("created album {}", created.id.as_str());
        Ok(created.id)
    }

    /// Returns the ID of the album named `name`, creating the album if it does not exist.
    pub fn get_or_create_album<C>(
        &self,
        access_token: &AccessToken,
        name: &str,
        http_client: &C,
    ) -> Result<AlbumId, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        match self.album_id(access_token, name, http_client)? {
            Some(album_id) => Ok(album_id),
            None => self.create_album(access_token, name, http_client),
        }
    }

    /// Uploads a photo into an album and returns the Graph API response (e.g., the photo ID).
    pub fn upload_photo<C>(
        &self,
        access_token: &AccessToken,
        album_id: &AlbumId,
        photo: &PhotoUpload,
        http_client: &C,
    ) -> Result<Value, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let url = self.endpoint(&[album_id.as_str(), "photos"])?;

        let mut form = MultipartForm::new().file(
            "source",
            &photo.file_name,
            &photo.content_type,
            &photo.bytes,
        );
        if let Some(message) = &photo.message {
            form = form.text("message", message);
        }
        let (content_type, body) = form.finish();

        execute(
            http_client,
            graph_request(
                Method::POST,
                url,
                Some(access_token),
                Some(content_type.as_str()),
                body,
            ),
        )
    }

    /// Sends an app notification to a user.
    ///
    /// `app_access_token` must be an app access token (see
    /// [`app_access_token`](Self::app_access_token)). Templates longer than
    /// [`MAX_NOTIFICATION_LENGTH`] characters are rejected without contacting Facebook.
    pub fn send_notification<C>(
        &self,
        app_access_token: &AccessToken,
        user_id: &UserId,
        notification: &Notification,
        http_client: &C,
    ) -> Result<Value, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        notification.validate().map_err(GraphError::Validation)?;

        let url = self.endpoint(&[user_id.as_str(), "notifications"])?;

        let mut fields = vec![
            ("access_token", app_access_token.secret().as_str()),
            ("template", notification.template.as_str()),
        ];
        if let Some(href) = &notification.href {
            fields.push(("href", href.as_str()));
        }

        execute(
            http_client,
            graph_request(
                Method::POST,
                url,
                None,
                Some(MIME_TYPE_FORM_URLENCODED),
                form_urlencoded(fields),
            ),
        )
    }

    ///
    /// Returns an app access token, serving it from `cache` while it remains valid.
    ///
    /// On a cache miss, a new token is requested with the `client_credentials` grant and stored
    /// in `cache`.
    ///
    pub fn app_access_token<C>(
        &self,
        cache: &mut AppAccessTokenCache,
        http_client: &C,
    ) -> Result<AccessToken, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let now = Utc::now();
        if let Some(token) = cache.get(now) {
            return Ok(token.clone());
        }

        let url = self
            .token_endpoint(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.secret().as_str()),
                ("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS),
            ])
            .map_err(GraphError::UrlParse)?;
        log::debug!("requesting a new app access token");
        let response = self.token_request(url, http_client)?;

        cache.store_response(&response, now);
        Ok(response.access_token)
    }

    /// Exchanges a short-lived user access token for a long-lived one.
    pub fn long_lived_access_token<C>(
        &self,
        existing_token: &AccessToken,
        http_client: &C,
    ) -> Result<AccessTokenResponse, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let url = self
            .token_endpoint(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.secret().as_str()),
                ("grant_type", GRANT_TYPE_FB_EXCHANGE_TOKEN),
                ("fb_exchange_token", existing_token.secret().as_str()),
            ])
            .map_err(GraphError::UrlParse)?;
        log::debug!("exchanging access token for a long-lived token");
        self.token_request(url, http_client)
    }

    ///
    /// Returns the total engagement count (reactions, comments, and shares) of an external URL.
    ///
    /// Returns `0` when Facebook has no engagement data for the URL.
    ///
    pub fn like_count<C>(
        &self,
        access_token: &AccessToken,
        url: &str,
        http_client: &C,
    ) -> Result<u64, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let mut endpoint = self.endpoint(&[])?;
        endpoint
            .query_pairs_mut()
            .append_pair("id", url)
            .append_pair("fields", "engagement");

        let object: UrlObject = execute(
            http_client,
            graph_request(Method::GET, endpoint, Some(access_token), None, Vec::new()),
        )?;

        Ok(object
            .engagement
            .map(|engagement| engagement.values().filter_map(Value::as_u64).sum::<u64>())
            .unwrap_or(0))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, url::ParseError> {
        match &self.graph_url {
            Some(graph_url) => graph_url.endpoint(segments),
            None => GraphUrl::new(DEFAULT_GRAPH_URL.to_string())?.endpoint(segments),
        }
    }

    fn token_endpoint(&self, params: &[(&str, &str)]) -> Result<Url, url::ParseError> {
        let mut url = match &self.token_url {
            Some(token_url) => token_url.url().clone(),
            None => Url::parse(DEFAULT_TOKEN_URL)?,
        };
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    fn token_request<C>(
        &self,
        url: Url,
        http_client: &C,
    ) -> Result<AccessTokenResponse, GraphError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let request = graph_request(Method::GET, url, None, None, Vec::new())
            .map_err(|err| GraphError::Other(format!("failed to prepare request: {err}")))?;
        let response = http_client.call(request).map_err(GraphError::Request)?;
        token_response(response)
    }
}

fn graph_request(
    method: Method,
    url: Url,
    access_token: Option<&AccessToken>,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> Result<HttpRequest, http::Error> {
    let mut builder = http::Request::builder()
        .uri(url.as_str())
        .method(method)
        .header(ACCEPT, HeaderValue::from_static(MIME_TYPE_JSON));
    if let Some(access_token) = access_token {
        let (name, value) = auth_bearer(access_token)?;
        builder = builder.header(name, value);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
    }
    builder.body(body)
}

fn execute<C, T>(
    http_client: &C,
    request: Result<HttpRequest, http::Error>,
) -> Result<T, GraphError<<C as SyncHttpClient>::Error>>
where
    C: SyncHttpClient,
    T: DeserializeOwned,
{
    let request =
        request.map_err(|err| GraphError::Other(format!("failed to prepare request: {err}")))?;
    // NB: only the path is logged since the query string may carry user-supplied values.
    log::debug!("Graph API {} {}", request.method(), request.uri().path());

    http_client
        .call(request)
        .map_err(GraphError::Request)
        .and_then(graph_response)
}

fn graph_response<T, RE>(response: HttpResponse) -> Result<T, GraphError<RE>>
where
    T: DeserializeOwned,
    RE: std::error::Error + 'static,
{
    check_status::<RE>(&response)?;

    check_content_type(response.headers(), &[MIME_TYPE_JSON, MIME_TYPE_JAVASCRIPT]).map_err(
        |err_msg| GraphError::Response(response.status(), response.body().to_owned(), err_msg),
    )?;

    serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(response.body()))
        .map_err(GraphError::Parse)
}

fn token_response<RE>(response: HttpResponse) -> Result<AccessTokenResponse, GraphError<RE>>
where
    RE: std::error::Error + 'static,
{
    check_status::<RE>(&response)?;

    let body = response.body();
    if body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
        return serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(body))
            .map_err(GraphError::Parse);
    }

    // Legacy token responses are urlencoded (e.g., `access_token=...&expires=5183999`).
    let fields = url::form_urlencoded::parse(body)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect::<Map<_, _>>();
    serde_path_to_error::deserialize(Value::Object(fields)).map_err(GraphError::Parse)
}

fn check_status<RE>(response: &HttpResponse) -> Result<(), GraphError<RE>>
where
    RE: std::error::Error + 'static,
{
    if response.status().is_success() {
        return Ok(());
    }

    match serde_json::from_slice::<GraphErrorEnvelope>(response.body()) {
        Ok(envelope) => {
            log::warn!(
                "Graph API error (HTTP status code {}): {}",
                response.status(),
                envelope.error
            );
            Err(GraphError::ServerResponse(envelope.error))
        }
        Err(_) => Err(GraphError::Response(
            response.status(),
            response.body().to_owned(),
            format!("HTTP status code {}", response.status()),
        )),
    }
}

/// Error calling the Facebook OAuth endpoints or the Graph API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError<RE>
where
    RE: std::error::Error + 'static,
{
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
    /// Failed to parse server response.
    #[error("Failed to parse server response")]
    Parse(#[source] serde_path_to_error::Error<serde_json::Error>),
    /// An error occurred while sending the request or receiving the response (e.g., network
    /// connectivity failed).
    #[error("Request failed")]
    Request(#[source] RE),
    /// Server returned an invalid response.
    #[error("Server returned invalid response: {2}")]
    Response(StatusCode, Vec<u8>, String),
    /// Server returned a Graph API error object.
    #[error("Server returned error: {0}")]
    ServerResponse(GraphErrorResponse),
    /// Failed to build an endpoint URL.
    #[error("Failed to parse URL")]
    UrlParse(#[source] url::ParseError),
    /// Input was rejected before contacting Facebook.
    #[error("Validation error: {0}")]
    Validation(String),
}
impl<RE> From<url::ParseError> for GraphError<RE>
where
    RE: std::error::Error + 'static,
{
    fn from(err: url::ParseError) -> Self {
        GraphError::UrlParse(err)
    }
}

#[derive(Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorResponse,
}

/// Error object returned by the Graph API.
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct GraphErrorResponse {
    #[serde(default)]
    message: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "deserialize_option_or_none"
    )]
    error_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    code: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    error_subcode: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    fbtrace_id: Option<String>,
}
impl GraphErrorResponse {
    /// Human-readable error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Error type (e.g., `OAuthException`).
    pub fn error_type(&self) -> Option<&str> {
        self.error_type.as_deref()
    }

    /// Numeric error code.
    pub fn code(&self) -> Option<i64> {
        self.code
    }

    /// Numeric error subcode.
    pub fn error_subcode(&self) -> Option<i64> {
        self.error_subcode
    }

    /// Trace ID to quote when reporting the error to Facebook.
    pub fn fbtrace_id(&self) -> Option<&str> {
        self.fbtrace_id.as_deref()
    }
}
impl Display for GraphErrorResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(error_type) = &self.error_type {
            write!(f, "{}: ", error_type)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        Ok(())
    }
}

/// Access token returned by the OAuth token endpoint.
#[serde_as]
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccessTokenResponse {
    access_token: AccessToken,
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    token_type: Option<String>,
    #[serde(alias = "expires")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    expires_in: Option<u64>,
}
impl AccessTokenResponse {
    /// Returns the access token.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Returns the token type (typically `bearer`), if reported.
    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// Returns the lifetime of the token, if reported.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }

    /// Consumes the response and returns the access token.
    pub fn into_access_token(self) -> AccessToken {
        self.access_token
    }
}

///
/// Caller-owned cache of the app access token.
///
/// Facebook app access tokens usually never expire, in which case the cached token is reused
/// indefinitely. Tokens reported with a lifetime are refreshed once that lifetime has elapsed.
///
#[derive(Clone, Debug, Default)]
pub struct AppAccessTokenCache {
    entry: Option<(AccessToken, Option<DateTime<Utc>>)>,
}
impl AppAccessTokenCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if it is still valid at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<&AccessToken> {
        match &self.entry {
            Some((token, None)) => Some(token),
            Some((token, Some(expires_at))) if now < *expires_at => Some(token),
            _ => None,
        }
    }

    /// Caches `token` until `expires_at` (or indefinitely if `None`).
    pub fn store(&mut self, token: AccessToken, expires_at: Option<DateTime<Utc>>) {
        self.entry = Some((token, expires_at));
    }

    /// Evicts the cached token.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Returns when the cached token expires, if it has a known lifetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().and_then(|(_, expires_at)| *expires_at)
    }

    fn store_response(&mut self, response: &AccessTokenResponse, now: DateTime<Utc>) {
        let expires_at = response
            .expires_in()
            .and_then(|expires_in| chrono::Duration::from_std(expires_in).ok())
            .and_then(|expires_in| now.checked_add_signed(expires_in));
        self.store(response.access_token.clone(), expires_at);
    }
}

/// Photo to upload into an album.
#[derive(Clone)]
pub struct PhotoUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
    message: Option<String>,
}
impl PhotoUpload {
    /// Creates an upload from in-memory image bytes.
    ///
    /// The content type is inferred from the extension of `file_name`.
    pub fn new(file_name: String, bytes: Vec<u8>) -> Self {
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
            message: None,
        }
    }

    /// Reads the image at `path`.
    pub fn from_path<P>(path: P) -> std::io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|file_name| file_name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string());
        Ok(Self::new(file_name, bytes))
    }

    /// Sets the caption of the photo.
    pub fn set_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    /// Overrides the inferred content type.
    pub fn set_content_type(mut self, content_type: String) -> Self {
        self.content_type = content_type;
        self
    }

    /// Returns the file name sent to Facebook.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the content type of the image.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the caption of the photo.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
impl Debug for PhotoUpload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .field("message", &self.message)
            .finish()
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(MIME_TYPE_OCTET_STREAM)
}

/// App notification sent to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    template: String,
    href: Option<String>,
}
impl Notification {
    /// Creates a notification with the given template text.
    ///
    /// Templates may reference users with the `@[user_id]` syntax.
    pub fn new(template: String) -> Self {
        Self {
            template,
            href: None,
        }
    }

    /// Sets the app-relative path the notification links to (e.g., `?ref=notif`).
    pub fn set_href(mut self, href: Option<String>) -> Self {
        self.href = href;
        self
    }

    /// Returns the template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the link target.
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let length = self.template.chars().count();
        if length > MAX_NOTIFICATION_LENGTH {
            return Err(format!(
                "notification template is {} characters long (maximum {})",
                length, MAX_NOTIFICATION_LENGTH
            ));
        }
        Ok(())
    }
}

/// Album owned by the current user.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Album {
    id: AlbumId,
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    name: Option<String>,
}
impl Album {
    /// Returns the album ID.
    pub fn id(&self) -> &AlbumId {
        &self.id
    }

    /// Returns the album name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct GraphList<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct CreatedObject<T> {
    id: T,
}

#[derive(Deserialize)]
struct UrlObject {
    #[serde(default, deserialize_with = "deserialize_option_or_none")]
    engagement: Option<Map<String, Value>>,
}
