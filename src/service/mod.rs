use crate::graph::{
    AccessTokenResponse, AppAccessTokenCache, GraphError, Notification, PhotoUpload,
};
use crate::host::{
    EventDispatcher, FacebookEvent, InboundRequest, SessionStore, UrlGenerationError,
    UrlGenerator, SESSION_ACCESS_TOKEN, SESSION_PAGE_LIKED, SESSION_STATE,
    SIGNED_REQUEST_ATTRIBUTE, SIGNED_REQUEST_FIELD,
};
use crate::signed_request::{self, DecodedPayload, SignedRequestError};
use crate::{
    AccessToken, AlbumId, AuthorizationCode, CsrfToken, FacebookConfig, GraphClient, RedirectUrl,
    SyncHttpClient, UserId,
};

use serde_json::{Map, Value};
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::Url;


/// Error handling a Facebook integration request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError<RE>
where
    RE: std::error::Error + 'static,
{
    /// A Graph API or OAuth request failed.
    #[error("Graph API request failed")]
    Graph(#[source] GraphError<RE>),
    /// The session holds no user access token.
    #[error("No access token in session")]
    MissingAccessToken,
    /// The request carries no authorization code.
    #[error("No authorization code in request")]
    MissingCode,
    /// The `state` parameter does not match the one stored when authorization started.
    #[error("OAuth state mismatch")]
    InvalidState,
    /// The session holds a value of an unexpected type.
    #[error("Session error: {0}")]
    Session(String),
    /// The signed request is missing, malformed, or forged.
    #[error("Invalid signed request")]
    SignedRequest(#[source] SignedRequestError),
    /// Failed to generate the redirect URL.
    #[error("Failed to generate redirect URL")]
    UrlGeneration(#[source] UrlGenerationError),
}
impl<RE> From<GraphError<RE>> for ServiceError<RE>
where
    RE: std::error::Error + 'static,
{
    fn from(err: GraphError<RE>) -> Self {
        ServiceError::Graph(err)
    }
}
impl<RE> From<SignedRequestError> for ServiceError<RE>
where
    RE: std::error::Error + 'static,
{
    fn from(err: SignedRequestError) -> Self {
        ServiceError::SignedRequest(err)
    }
}
impl<RE> From<UrlGenerationError> for ServiceError<RE>
where
    RE: std::error::Error + 'static,
{
    fn from(err: UrlGenerationError) -> Self {
        ServiceError::UrlGeneration(err)
    }
}

///
/// Facebook integration for a single inbound request cycle.
///
/// The service is built from a [`FacebookConfig`] and the host's collaborators: a per-user
/// [`SessionStore`], a [`UrlGenerator`] resolving the configured redirect route, and an
/// [`EventDispatcher`] receiving the `fb.user_info`, `fb.like`, and `fb.unlike` events.
///
/// Hosts typically call [`on_request`](Self::on_request) before routing each request, which
/// verifies any signed request, caches the facts it carries in the session, and completes the
/// OAuth code exchange when the redirect route is hit.
///
/// # Example
///
/// ```
/// use fb_canvas::{
///     AppSecret, ClientId, FacebookConfig, FacebookService, InboundRequest, MemorySession,
///     RecordingDispatcher, RouteName, SignedRequest, StaticUrlGenerator,
/// };
/// use serde_json::json;
/// use url::Url;
///
/// let app_secret = AppSecret::new("s3cret".to_string());
/// let config = FacebookConfig::new(
///     ClientId::new("1234".to_string()),
///     app_secret.clone(),
///     RouteName::new("facebook_callback".to_string()),
/// );
/// let url_generator = StaticUrlGenerator::new(Url::parse("https://app.example.com/").unwrap())
///     .add_route(RouteName::new("facebook_callback".to_string()), "/facebook/callback");
///
/// let mut service = FacebookService::new(
///     config,
///     MemorySession::new(),
///     url_generator,
///     RecordingDispatcher::new(),
/// );
///
/// let signed_request = SignedRequest::encode(
///     json!({"user_id": "100004", "page": {"id": "99", "liked": true}})
///         .as_object()
///         .unwrap(),
///     &app_secret,
/// )
/// .unwrap();
/// let mut request =
///     InboundRequest::new().set_form_field("signed_request", signed_request.secret());
///
/// let no_http = |_: fb_canvas::HttpRequest| -> Result<fb_canvas::HttpResponse, std::io::Error> {
///     unreachable!()
/// };
/// service.on_request(&mut request, &no_http).unwrap();
///
/// assert_eq!(service.dispatcher().event_names(), vec!["fb.user_info"]);
/// assert_eq!(service.is_page_liked(&request), Some(true));
/// ```
///
pub struct FacebookService<S, U, D>
where
    S: SessionStore,
    U: UrlGenerator,
    D: EventDispatcher,
{
    config: FacebookConfig,
    graph_client: GraphClient,
    session: S,
    url_generator: U,
    dispatcher: D,
}
impl<S, U, D> FacebookService<S, U, D>
where
    S: SessionStore,
    U: UrlGenerator,
    D: EventDispatcher,
{
    /// Creates a service from its configuration and the host's collaborators.
    pub fn new(config: FacebookConfig, session: S, url_generator: U, dispatcher: D) -> Self {
        let graph_client = config.graph_client();
        Self {
            config,
            graph_client,
            session,
            url_generator,
            dispatcher,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FacebookConfig {
        &self.config
    }

    /// Returns the Graph API client.
    pub fn graph_client(&self) -> &GraphClient {
        &self.graph_client
    }

    /// Returns the session store.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Returns the session store mutably.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Returns the event dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Returns the event dispatcher mutably.
    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Consumes the service and returns its session store, URL generator, and dispatcher.
    pub fn into_parts(self) -> (S, U, D) {
        (self.session, self.url_generator, self.dispatcher)
    }

    /// Verifies the signature of the request's `signed_request` form field.
    ///
    /// See [`signed_request::validate`].
    pub fn is_signed_request_valid(
        &self,
        request: &InboundRequest,
    ) -> Result<bool, SignedRequestError> {
        signed_request::validate(
            request.form_field(SIGNED_REQUEST_FIELD),
            self.config.app_secret(),
        )
    }

    /// Decodes the request's `signed_request` form field *without* verifying it.
    ///
    /// See [`signed_request::decode`].
    pub fn decode_signed_request(
        &self,
        request: &InboundRequest,
    ) -> Result<DecodedPayload, SignedRequestError> {
        signed_request::decode(request.form_field(SIGNED_REQUEST_FIELD))
    }

    /// Returns the absolute URL of the configured redirect route.
    pub fn redirect_url(&self) -> Result<RedirectUrl, UrlGenerationError> {
        self.url_generator
            .absolute_url(self.config.redirect_route())
            .map(RedirectUrl::from_url)
    }

    /// Returns the URL of the OAuth dialog requesting the configured permissions.
    pub fn authorization_url(&self) -> Result<Url, UrlGenerationError> {
        self.graph_client
            .authorization_url(&self.redirect_url()?, self.config.permissions(), None)
            .map_err(UrlGenerationError::UrlParse)
    }

    ///
    /// Returns the URL of the OAuth dialog with a fresh random `state` parameter.
    ///
    /// The state is stored in the session and checked when the user returns to the redirect
    /// route (see [`check_state`](Self::check_state)).
    ///
    pub fn authorization_url_with_state(&mut self) -> Result<Url, UrlGenerationError> {
        let state = CsrfToken::new_random();
        let url = self
            .graph_client
            .authorization_url(
                &self.redirect_url()?,
                self.config.permissions(),
                Some(&state),
            )
            .map_err(UrlGenerationError::UrlParse)?;

        self.session
            .set(SESSION_STATE, Value::String(state.into_secret()));
        Ok(url)
    }

    ///
    /// Checks the request's `state` parameter against the one stored by
    /// [`authorization_url_with_state`](Self::authorization_url_with_state).
    ///
    /// The stored state is consumed, so each state is accepted at most once. Returns `false` if
    /// either value is missing.
    ///
    pub fn check_state(&mut self, request: &InboundRequest) -> bool {
        let expected = match self.session.remove(SESSION_STATE) {
            Some(Value::String(expected)) => expected,
            _ => return false,
        };
        match request.state() {
            Some(state) => expected.as_bytes().ct_eq(state.as_bytes()).into(),
            None => false,
        }
    }

    ///
    /// Returns the URL exchanging `code` for an access token.
    ///
    /// # Security Warning
    ///
    /// The returned URL embeds the app secret. Do not log it or expose it to users.
    ///
    pub fn token_url(&self, code: &AuthorizationCode) -> Result<Url, UrlGenerationError> {
        self.graph_client
            .token_url(&self.redirect_url()?, code)
            .map_err(UrlGenerationError::UrlParse)
    }

    ///
    /// Exchanges the request's `code` for a user access token and fetches the user's data.
    ///
    /// The access token is stored in the session. If authorization was started with
    /// [`authorization_url_with_state`](Self::authorization_url_with_state), the request's
    /// `state` must match the stored one.
    ///
    pub fn user_data<C>(
        &mut self,
        request: &InboundRequest,
        http_client: &C,
    ) -> Result<Map<String, Value>, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let code = match request.code() {
            Some(code) => AuthorizationCode::new(code.to_string()),
            None => return Err(ServiceError::MissingCode),
        };
        if self.session.has(SESSION_STATE) && !self.check_state(request) {
            log::warn!("OAuth callback state does not match the stored state");
            return Err(ServiceError::InvalidState);
        }

        let redirect_url = self.redirect_url()?;
        let token = self
            .graph_client
            .exchange_code(&redirect_url, &code, http_client)?
            .into_access_token();
        self.store_access_token(&token);

        Ok(self.graph_client.user_data(&token, http_client)?)
    }

    /// Returns the ID of the current user's album named `name`.
    pub fn album_id<C>(
        &self,
        name: &str,
        http_client: &C,
    ) -> Result<Option<AlbumId>, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let access_token = self.session_access_token::<C::Error>()?;
        Ok(self
            .graph_client
            .album_id(&access_token, name, http_client)?)
    }

    /// Creates an album named `name` for the current user.
    pub fn create_album<C>(
        &self,
        name: &str,
        http_client: &C,
    ) -> Result<AlbumId, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let access_token = self.session_access_token::<C::Error>()?;
        Ok(self
            .graph_client
            .create_album(&access_token, name, http_client)?)
    }

    /// Returns the ID of the current user's album named `name`, creating it if necessary.
    pub fn get_or_create_album<C>(
        &self,
        name: &str,
        http_client: &C,
    ) -> Result<AlbumId, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let access_token = self.session_access_token::<C::Error>()?;
        Ok(self
            .graph_client
            .get_or_create_album(&access_token, name, http_client)?)
    }

    /// Uploads a photo into one of the current user's albums.
    pub fn upload_photo<C>(
        &self,
        album_id: &AlbumId,
        photo: &PhotoUpload,
        http_client: &C,
    ) -> Result<Value, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let access_token = self.session_access_token::<C::Error>()?;
        Ok(self
            .graph_client
            .upload_photo(&access_token, album_id, photo, http_client)?)
    }

    /// Sends an app notification to a user, authenticating with the app access token.
    pub fn send_notification<C>(
        &self,
        user_id: &UserId,
        notification: &Notification,
        cache: &mut AppAccessTokenCache,
        http_client: &C,
    ) -> Result<Value, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        notification
            .validate()
            .map_err(|err| ServiceError::Graph(GraphError::Validation(err)))?;

        let app_token = self.graph_client.app_access_token(cache, http_client)?;
        Ok(self
            .graph_client
            .send_notification(&app_token, user_id, notification, http_client)?)
    }

    /// Exchanges a short-lived user access token for a long-lived one.
    pub fn long_lived_access_token<C>(
        &self,
        existing_token: &AccessToken,
        http_client: &C,
    ) -> Result<AccessTokenResponse, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        Ok(self
            .graph_client
            .long_lived_access_token(existing_token, http_client)?)
    }

    /// Returns the total engagement count of an external URL.
    pub fn like_count<C>(
        &self,
        url: &str,
        cache: &mut AppAccessTokenCache,
        http_client: &C,
    ) -> Result<u64, ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let app_token = self.graph_client.app_access_token(cache, http_client)?;
        Ok(self.graph_client.like_count(&app_token, url, http_client)?)
    }

    ///
    /// Returns whether the current user likes the page hosting the app.
    ///
    /// The answer is read from the request's verified signed request and cached in the session.
    /// When the signed request carries a `page.liked` value that differs from the cached one,
    /// `fb.like` or `fb.unlike` is dispatched. If the signed request is missing or cannot be
    /// verified, the last cached value is returned instead.
    ///
    pub fn is_page_liked(&mut self, request: &InboundRequest) -> Option<bool> {
        match signed_request::verified_payload(
            request.form_field(SIGNED_REQUEST_FIELD),
            self.config.app_secret(),
        ) {
            Ok(payload) => Some(self.record_page_liked(payload.page_liked())),
            Err(err) => {
                log::debug!("falling back to cached page liked status: {}", err);
                self.cached_page_liked()
            }
        }
    }

    ///
    /// Request lifecycle hook, to be invoked before routing each inbound request.
    ///
    /// 1. If the request carries a signed request that verifies, `fb.user_info` is dispatched
    ///    with the payload, the user's access token and page liked status are cached in the
    ///    session, and the payload is attached to the request under the `fb.signed_request`
    ///    attribute. A signed request that fails verification is logged and ignored.
    /// 2. If the request targets the configured redirect route and carries a `code`, the code is
    ///    exchanged for an access token and `fb.user_info` is dispatched with the user's data.
    ///
    pub fn on_request<C>(
        &mut self,
        request: &mut InboundRequest,
        http_client: &C,
    ) -> Result<(), ServiceError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        if let Some(signed_request) = request.signed_request() {
            match signed_request.verified_payload(self.config.app_secret()) {
                Ok(payload) => {
                    self.dispatcher
                        .dispatch(FacebookEvent::UserInfo(payload.as_map().clone()));
                    if let Some(token) = payload.oauth_token() {
                        self.store_access_token(&token);
                    }
                    self.record_page_liked(payload.page_liked());

                    request
                        .set_attribute(SIGNED_REQUEST_ATTRIBUTE, Value::Object(payload.into_map()));
                }
                Err(err) => log::warn!("ignoring signed request: {}", err),
            }
        }

        if request.route() == Some(self.config.redirect_route()) && request.code().is_some() {
            let user_data = self.user_data(request, http_client)?;
            self.dispatcher.dispatch(FacebookEvent::UserInfo(user_data));
        }

        Ok(())
    }

    // Caches the page liked status, dispatching `fb.like`/`fb.unlike` when it changes. An absent
    // status is stored as `false` but never triggers an event.
    fn record_page_liked(&mut self, liked: Option<bool>) -> bool {
        if let (Some(liked), Some(previous)) = (liked, self.cached_page_liked()) {
            if liked != previous {
                log::debug!("page liked status changed to {}", liked);
                self.dispatcher.dispatch(if liked {
                    FacebookEvent::Like
                } else {
                    FacebookEvent::Unlike
                });
            }
        }

        let liked = liked.unwrap_or(false);
        self.session.set(SESSION_PAGE_LIKED, Value::Bool(liked));
        liked
    }

    fn cached_page_liked(&self) -> Option<bool> {
        self.session
            .get(SESSION_PAGE_LIKED)
            .and_then(|value| value.as_bool())
    }

    fn store_access_token(&mut self, token: &AccessToken) {
        self.session
            .set(SESSION_ACCESS_TOKEN, Value::String(token.secret().clone()));
    }

    fn session_access_token<RE>(&self) -> Result<AccessToken, ServiceError<RE>>
    where
        RE: std::error::Error + 'static,
    {
        match self.session.get(SESSION_ACCESS_TOKEN) {
            Some(Value::String(token)) => Ok(AccessToken::new(token)),
            Some(_) => Err(ServiceError::Session(format!(
                "`{}` is not a string",
                SESSION_ACCESS_TOKEN
            ))),
            None => Err(ServiceError::MissingAccessToken),
        }
    }
}
