use fb_canvas::host::{SESSION_ACCESS_TOKEN, SESSION_PAGE_LIKED, SIGNED_REQUEST_ATTRIBUTE};
use fb_canvas::{
    signed_request, AppAccessTokenCache, AppSecret, ClientId, FacebookConfig, FacebookEvent,
    FacebookService, HttpRequest, HttpResponse, InboundRequest, MemorySession, Notification,
    PhotoUpload, RecordingDispatcher, RouteName, Scope, ServiceError, SessionStore, SignedRequest,
    SignedRequestError, StaticUrlGenerator, UserId,
};

use http::header::CONTENT_TYPE;
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use url::Url;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Once;

static INIT_LOG: Once = Once::new();

fn init_log() {
    INIT_LOG.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

type CanvasService = FacebookService<MemorySession, StaticUrlGenerator, RecordingDispatcher>;

fn app_secret() -> AppSecret {
    AppSecret::new("s3cret".to_string())
}

fn canvas_service() -> CanvasService {
    let config: FacebookConfig = serde_json::from_value(json!({
        "app_id": "1234",
        "app_secret": "s3cret",
        "permissions": ["email", "user_photos", "publish_actions"],
        "redirect_route": "facebook_callback",
    }))
    .unwrap();
    let url_generator = StaticUrlGenerator::new(Url::parse("https://app.example.com/").unwrap())
        .add_route(
            RouteName::new("facebook_callback".to_string()),
            "/facebook/callback",
        );

    FacebookService::new(
        config,
        MemorySession::new(),
        url_generator,
        RecordingDispatcher::new(),
    )
}

fn canvas_request(payload: Value) -> InboundRequest {
    let raw = SignedRequest::encode(payload.as_object().unwrap(), &app_secret()).unwrap();
    InboundRequest::new().set_form_body(
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("signed_request", raw.secret())
            .finish()
            .as_bytes(),
    )
}

fn json_response(body: &str) -> HttpResponse {
    http::Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json; charset=UTF-8")
        .body(body.as_bytes().to_vec())
        .unwrap()
}

fn mock_http_client(
    requests: &RefCell<Vec<HttpRequest>>,
    responses: Vec<HttpResponse>,
) -> impl Fn(HttpRequest) -> Result<HttpResponse, std::io::Error> + '_ {
    let responses = RefCell::new(responses.into_iter().collect::<VecDeque<_>>());
    move |request: HttpRequest| {
        requests.borrow_mut().push(request);
        Ok(responses
            .borrow_mut()
            .pop_front()
            .expect("unexpected HTTP request"))
    }
}

fn no_http_client(_: HttpRequest) -> Result<HttpResponse, std::io::Error> {
    panic!("no HTTP request expected")
}

#[test]
fn test_validate_and_decode_signed_request() {
    init_log();

    let raw = SignedRequest::encode(
        json!({"user_id": "100004", "page": {"id": "99", "liked": true, "admin": false}})
            .as_object()
            .unwrap(),
        &app_secret(),
    )
    .unwrap()
    .into_secret();

    assert!(signed_request::validate(Some(&raw), &app_secret()).unwrap());
    assert!(
        !signed_request::validate(Some(&raw), &AppSecret::new("other".to_string())).unwrap()
    );

    let payload = signed_request::decode(Some(&raw)).unwrap();
    assert_eq!(payload.user_id(), Some(UserId::new("100004".to_string())));
    assert_eq!(payload.page_liked(), Some(true));
    assert_eq!(payload.get("algorithm"), None);

    match signed_request::decode(None) {
        Err(SignedRequestError::MissingSignedRequest) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_canvas_visit_then_like() {
    init_log();

    let mut service = canvas_service();

    // First visit: the user hasn't liked the page yet.
    let mut first = canvas_request(json!({
        "user_id": "100004",
        "oauth_token": "user-token",
        "page": {"id": "99", "liked": false, "admin": false},
    }));
    service.on_request(&mut first, &no_http_client).unwrap();

    assert_eq!(
        first
            .attribute(SIGNED_REQUEST_ATTRIBUTE)
            .and_then(|payload| payload.get("user_id")),
        Some(&json!("100004"))
    );
    assert_eq!(
        service.session().get(SESSION_ACCESS_TOKEN),
        Some(json!("user-token"))
    );
    assert_eq!(
        service.session().get(SESSION_PAGE_LIKED),
        Some(Value::Bool(false))
    );
    assert_eq!(service.dispatcher().event_names(), vec!["fb.user_info"]);

    // Second visit after liking the page.
    let mut second = canvas_request(json!({
        "user_id": "100004",
        "oauth_token": "user-token",
        "page": {"id": "99", "liked": true, "admin": false},
    }));
    service.on_request(&mut second, &no_http_client).unwrap();

    assert_eq!(
        service.dispatcher().event_names(),
        vec!["fb.user_info", "fb.user_info", "fb.like"]
    );
    assert_eq!(service.is_page_liked(&second), Some(true));

    // Plain request without a signed request falls back to the session.
    assert_eq!(service.is_page_liked(&InboundRequest::new()), Some(true));
    assert_eq!(service.dispatcher().events().len(), 3);
}

#[test]
fn test_forged_canvas_request() {
    init_log();

    let mut service = canvas_service();
    let raw = SignedRequest::encode(
        json!({"user_id": "1", "oauth_token": "stolen", "page": {"id": "99", "liked": true}})
            .as_object()
            .unwrap(),
        &AppSecret::new("attacker".to_string()),
    )
    .unwrap();
    let mut request = InboundRequest::new().set_form_field("signed_request", raw.secret());

    service.on_request(&mut request, &no_http_client).unwrap();

    assert!(service.dispatcher().events().is_empty());
    assert!(service.session().is_empty());
    assert_eq!(request.attribute(SIGNED_REQUEST_ATTRIBUTE), None);
}

#[test]
fn test_forged_canvas_request_on_callback() {
    init_log();

    let mut service = canvas_service();
    let raw = SignedRequest::encode(
        json!({"user_id": "1", "oauth_token": "stolen"})
            .as_object()
            .unwrap(),
        &AppSecret::new("attacker".to_string()),
    )
    .unwrap();

    let requests = RefCell::new(vec![]);
    let http_client = mock_http_client(
        &requests,
        vec![
            json_response("{\"access_token\":\"user-token\"}"),
            json_response("{\"id\":\"100004\"}"),
        ],
    );

    // The code exchange still completes even though the signed request is ignored.
    let mut callback = InboundRequest::new()
        .set_route(Some(RouteName::new("facebook_callback".to_string())))
        .set_query_param("code", "auth-code")
        .set_form_field("signed_request", raw.secret());
    service.on_request(&mut callback, &http_client).unwrap();

    assert_eq!(service.dispatcher().event_names(), vec!["fb.user_info"]);
    assert_eq!(
        service.session().get(SESSION_ACCESS_TOKEN),
        Some(json!("user-token"))
    );
    assert_eq!(callback.attribute(SIGNED_REQUEST_ATTRIBUTE), None);
    assert_eq!(requests.borrow().len(), 2);
}

#[test]
fn test_oauth_login_and_photo_upload() {
    init_log();

    let mut service = canvas_service();

    let authorization_url = service.authorization_url_with_state().unwrap();
    let state = authorization_url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    assert_eq!(
        authorization_url
            .query_pairs()
            .find(|(key, _)| key == "scope")
            .map(|(_, value)| value.into_owned()),
        Some("email,user_photos,publish_actions".to_string())
    );

    let requests = RefCell::new(vec![]);
    let http_client = mock_http_client(
        &requests,
        vec![
            json_response("{\"access_token\":\"user-token\",\"expires_in\":5183944}"),
            json_response("{\"id\":\"100004\",\"name\":\"Jane Doe\"}"),
            json_response("{\"data\":[{\"id\":\"555\",\"name\":\"Other\"}]}"),
            json_response("{\"id\":\"777\"}"),
            json_response("{\"id\":\"888\",\"post_id\":\"100004_888\"}"),
        ],
    );

    let mut callback = InboundRequest::new()
        .set_route(Some(RouteName::new("facebook_callback".to_string())))
        .set_query_string(&format!("code=auth-code&state={}", state));
    service.on_request(&mut callback, &http_client).unwrap();

    assert_eq!(service.dispatcher().event_names(), vec!["fb.user_info"]);
    assert_eq!(
        service.dispatcher().events()[0],
        FacebookEvent::UserInfo(
            json!({"id": "100004", "name": "Jane Doe"})
                .as_object()
                .unwrap()
                .clone()
        )
    );
    assert_eq!(
        service.session().get(SESSION_ACCESS_TOKEN),
        Some(json!("user-token"))
    );

    let album_id = service
        .get_or_create_album("Canvas Photos", &http_client)
        .unwrap();
    assert_eq!(album_id.as_str(), "777");

    let response = service
        .upload_photo(
            &album_id,
            &PhotoUpload::new("cat.png".to_string(), vec![0x89, 0x50, 0x4e, 0x47])
                .set_message(Some("My cat".to_string())),
            &http_client,
        )
        .unwrap();
    assert_eq!(response["post_id"], json!("100004_888"));

    let requests = requests.borrow();
    assert_eq!(
        requests
            .iter()
            .map(|request| request.uri().path().to_string())
            .collect::<Vec<_>>(),
        vec![
            "/oauth/access_token",
            "/me",
            "/me/albums",
            "/me/albums",
            "/777/photos",
        ]
    );
    assert!(requests[0]
        .uri()
        .query()
        .unwrap()
        .contains("code=auth-code"));
}

#[test]
fn test_callback_with_wrong_state() {
    init_log();

    let mut service = canvas_service();
    service.authorization_url_with_state().unwrap();

    let mut callback = InboundRequest::new()
        .set_route(Some(RouteName::new("facebook_callback".to_string())))
        .set_query_param("code", "auth-code")
        .set_query_param("state", "forged");

    match service.on_request(&mut callback, &no_http_client) {
        Err(ServiceError::InvalidState) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(service.dispatcher().events().is_empty());
}

#[test]
fn test_notification_with_app_token() {
    init_log();

    let service = canvas_service();
    let mut cache = AppAccessTokenCache::new();

    let requests = RefCell::new(vec![]);
    let http_client = mock_http_client(
        &requests,
        vec![
            json_response("{\"access_token\":\"1234|app\",\"token_type\":\"bearer\"}"),
            json_response("{\"success\":true}"),
            json_response("{\"success\":true}"),
        ],
    );

    let notification = Notification::new("You have a new badge!".to_string());
    for _ in 0..2 {
        let response = service
            .send_notification(
                &UserId::new("100004".to_string()),
                &notification,
                &mut cache,
                &http_client,
            )
            .unwrap();
        assert_eq!(response, json!({"success": true}));
    }

    // The app access token is fetched once and then served from the cache.
    let requests = requests.borrow();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].uri().path(), "/oauth/access_token");
    assert_eq!(requests[1].uri().path(), "/100004/notifications");
    assert_eq!(requests[2].uri().path(), "/100004/notifications");
    assert_eq!(cache.expires_at(), None);
}

#[test]
fn test_permissions_round_trip_through_config() {
    let service = canvas_service();
    assert_eq!(
        service.config().permissions(),
        &[
            Scope::new("email".to_string()),
            Scope::new("user_photos".to_string()),
            Scope::new("publish_actions".to_string()),
        ][..]
    );
    assert_eq!(service.config().app_id(), &ClientId::new("1234".to_string()));
}
