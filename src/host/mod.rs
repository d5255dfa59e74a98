//!
//! Collaborators supplied by the host web framework.
//!
//! The service never reaches into a framework container. Instead, the host passes in a
//! [`SessionStore`], a [`UrlGenerator`], and an [`EventDispatcher`], and describes each inbound
//! request with an [`InboundRequest`]. In-memory implementations of each trait are provided for
//! small hosts and for tests.
//!

use crate::signed_request::DecodedPayload;
use crate::{RouteName, SignedRequest};

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};


/// Session key holding the current user's access token.
pub const SESSION_ACCESS_TOKEN: &str = "fb.access_token";
/// Session key holding the last known "page liked" fact.
pub const SESSION_PAGE_LIKED: &str = "fb.page_liked";
/// Session key holding the CSRF state of a pending authorization.
pub const SESSION_STATE: &str = "fb.state";

/// Request attribute under which the verified signed request payload is attached.
pub const SIGNED_REQUEST_ATTRIBUTE: &str = "fb.signed_request";

/// Form field carrying the signed request.
pub const SIGNED_REQUEST_FIELD: &str = "signed_request";
const CODE_PARAM: &str = "code";
const STATE_PARAM: &str = "state";

/// Event name dispatched with the current user's data.
pub const EVENT_USER_INFO: &str = "fb.user_info";
/// Event name dispatched when the user starts liking the page.
pub const EVENT_LIKE: &str = "fb.like";
/// Event name dispatched when the user stops liking the page.
pub const EVENT_UNLIKE: &str = "fb.unlike";

/// Per-user key-value session storage owned by the host.
pub trait SessionStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: Value);

    /// Returns whether a value is stored under `key`.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes and returns the value stored under `key`.
    fn remove(&mut self, key: &str) -> Option<Value>;
}
impl<T> SessionStore for &mut T
where
    T: SessionStore + ?Sized,
{
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }
    fn set(&mut self, key: &str, value: Value) {
        (**self).set(key, value)
    }
    fn has(&self, key: &str) -> bool {
        (**self).has(key)
    }
    fn remove(&mut self, key: &str) -> Option<Value> {
        (**self).remove(key)
    }
}

/// Error generating the absolute URL of a route.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum UrlGenerationError {
    /// The route is not known to the host router.
    #[error("Unknown route `{0}`")]
    UnknownRoute(String),
    /// The generated URL could not be parsed.
    #[error("Failed to parse URL")]
    UrlParse(#[source] url::ParseError),
}

/// Generates absolute URLs for named host routes.
pub trait UrlGenerator {
    /// Returns the absolute URL of `route`.
    fn absolute_url(&self, route: &RouteName) -> Result<Url, UrlGenerationError>;
}
impl<T> UrlGenerator for &T
where
    T: UrlGenerator + ?Sized,
{
    fn absolute_url(&self, route: &RouteName) -> Result<Url, UrlGenerationError> {
        (**self).absolute_url(route)
    }
}

/// Domain event emitted towards the host.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum FacebookEvent {
    /// User data, either from a verified signed request or from the Graph API `/me` endpoint.
    UserInfo(Map<String, Value>),
    /// The user started liking the page hosting the app.
    Like,
    /// The user stopped liking the page hosting the app.
    Unlike,
}
impl FacebookEvent {
    /// Returns the event name (e.g., `fb.like`).
    pub fn name(&self) -> &'static str {
        match self {
            FacebookEvent::UserInfo(_) => EVENT_USER_INFO,
            FacebookEvent::Like => EVENT_LIKE,
            FacebookEvent::Unlike => EVENT_UNLIKE,
        }
    }

    /// Returns the payload carried by the event, if any.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        match self {
            FacebookEvent::UserInfo(payload) => Some(payload),
            FacebookEvent::Like | FacebookEvent::Unlike => None,
        }
    }
}

/// Receives domain events.
///
/// Any `FnMut(FacebookEvent)` closure is an `EventDispatcher`.
pub trait EventDispatcher {
    /// Delivers `event` to the host.
    fn dispatch(&mut self, event: FacebookEvent);
}
impl<F> EventDispatcher for F
where
    F: FnMut(FacebookEvent),
{
    fn dispatch(&mut self, event: FacebookEvent) {
        self(event)
    }
}

///
/// View of an inbound HTTP request.
///
/// Only the parts the service reads are modeled: the matched route name, the query string and
/// form body parameters, and a bag of request attributes the service may write to.
///
#[derive(Clone, Default)]
pub struct InboundRequest {
    route: Option<RouteName>,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    attributes: HashMap<String, Value>,
}
impl InboundRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name of the route matched by the host router.
    pub fn set_route(mut self, route: Option<RouteName>) -> Self {
        self.route = route;
        self
    }

    /// Adds the parameters of a raw query string (without the leading `?`).
    pub fn set_query_string(mut self, query: &str) -> Self {
        self.query.extend(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        );
        self
    }

    /// Adds the fields of an `application/x-www-form-urlencoded` body.
    pub fn set_form_body(mut self, body: &[u8]) -> Self {
        self.form.extend(
            url::form_urlencoded::parse(body)
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        );
        self
    }

    /// Sets a single query parameter.
    pub fn set_query_param(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    /// Sets a single form field.
    pub fn set_form_field(mut self, key: &str, value: &str) -> Self {
        self.form.insert(key.to_string(), value.to_string());
        self
    }

    /// Returns the name of the matched route.
    pub fn route(&self) -> Option<&RouteName> {
        self.route.as_ref()
    }

    /// Returns a query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Returns a form field.
    pub fn form_field(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    /// Returns a request parameter, looking at the query string before the form body.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query_param(key).or_else(|| self.form_field(key))
    }

    /// Returns the `signed_request` form field, if non-empty.
    pub fn signed_request(&self) -> Option<SignedRequest> {
        self.form_field(SIGNED_REQUEST_FIELD)
            .filter(|raw| !raw.is_empty())
            .map(|raw| SignedRequest::new(raw.to_string()))
    }

    /// Returns the OAuth `code` parameter, if non-empty.
    pub fn code(&self) -> Option<&str> {
        self.param(CODE_PARAM).filter(|code| !code.is_empty())
    }

    /// Returns the OAuth `state` parameter.
    pub fn state(&self) -> Option<&str> {
        self.param(STATE_PARAM)
    }

    /// Returns a request attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Sets a request attribute.
    pub fn set_attribute(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_string(), value);
    }

    /// Returns the verified signed request payload attached by
    /// [`FacebookService::on_request`](crate::FacebookService::on_request).
    pub fn signed_request_payload(&self) -> Option<DecodedPayload> {
        match self.attribute(SIGNED_REQUEST_ATTRIBUTE) {
            Some(Value::Object(payload)) => Some(DecodedPayload::from(payload.clone())),
            _ => None,
        }
    }
}
impl Debug for InboundRequest {
    // Parameter values may carry OAuth codes and tokens, so only their names are printed.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundRequest")
            .field("route", &self.route)
            .field("query", &sorted_keys(self.query.keys()))
            .field("form", &sorted_keys(self.form.keys()))
            .field("attributes", &sorted_keys(self.attributes.keys()))
            .finish()
    }
}

fn sorted_keys<'a, I>(keys: I) -> Vec<&'a str>
where
    I: Iterator<Item = &'a String>,
{
    let mut keys = keys.map(String::as_str).collect::<Vec<_>>();
    keys.sort_unstable();
    keys
}

/// Session store backed by a `HashMap`.
#[derive(Clone, Default)]
pub struct MemorySession(HashMap<String, Value>);
impl MemorySession {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the session is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<Value> {
        self.0.get(key).cloned()
    }
    fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
    fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
    fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }
}
impl Debug for MemorySession {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MemorySession")
            .field(&sorted_keys(self.0.keys()))
            .finish()
    }
}

/// URL generator resolving route names against a fixed table of paths.
#[derive(Clone, Debug)]
pub struct StaticUrlGenerator {
    base_url: Url,
    routes: HashMap<RouteName, String>,
}
impl StaticUrlGenerator {
    /// Creates a generator that resolves route paths relative to `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            routes: HashMap::new(),
        }
    }

    /// Registers the path of a route (e.g., `/facebook/callback`).
    pub fn add_route(mut self, route: RouteName, path: &str) -> Self {
        self.routes.insert(route, path.to_string());
        self
    }
}
impl UrlGenerator for StaticUrlGenerator {
    fn absolute_url(&self, route: &RouteName) -> Result<Url, UrlGenerationError> {
        let path = self
            .routes
            .get(route)
            .ok_or_else(|| UrlGenerationError::UnknownRoute(route.as_str().to_string()))?;
        self.base_url
            .join(path)
            .map_err(UrlGenerationError::UrlParse)
    }
}

/// Event dispatcher that records every event it receives.
#[derive(Clone, Debug, Default)]
pub struct RecordingDispatcher {
    events: Vec<FacebookEvent>,
}
impl RecordingDispatcher {
    /// Creates a dispatcher with no recorded events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in dispatch order.
    pub fn events(&self) -> &[FacebookEvent] {
        &self.events
    }

    /// Returns the names of the recorded events in dispatch order.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(FacebookEvent::name).collect()
    }

    /// Removes and returns the recorded events.
    pub fn take_events(&mut self) -> Vec<FacebookEvent> {
        std::mem::take(&mut self.events)
    }
}
impl EventDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, event: FacebookEvent) {
        self.events.push(event);
    }
}
