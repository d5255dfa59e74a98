//!
//! This example walks through the OAuth login flow of a Facebook canvas app and, optionally,
//! verifies a signed request copied from a canvas page.
//!
//! Before running it, you'll need to [create your own App](https://developers.facebook.com/docs/development/create-an-app)
//! with `http://localhost:8080/callback` as a valid OAuth redirect URI, and get the App ID and
//! secret.
//!
//! In order to run the example call:
//!
//! ```sh
//! APP_ID=xxx APP_SECRET=yyy cargo run --example canvas
//! ```
//!
//! ...and follow the instructions. Set `SIGNED_REQUEST` to a `signed_request` form field posted
//! by Facebook to have it verified and decoded as well.
//!

use fb_canvas::reqwest;
use fb_canvas::{
    signed_request, AppSecret, ClientId, FacebookConfig, FacebookEvent, FacebookService,
    InboundRequest, MemorySession, RecordingDispatcher, RouteName, Scope, StaticUrlGenerator,
};
use url::Url;

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::exit;

const CALLBACK_ROUTE: &str = "facebook_callback";

fn handle_error<T: std::error::Error>(fail: &T, msg: &'static str) -> ! {
    let mut err_msg = format!("ERROR: {}", msg);
    let mut cur_fail: Option<&dyn std::error::Error> = Some(fail);
    while let Some(cause) = cur_fail {
        err_msg += &format!("\n    caused by: {}", cause);
        cur_fail = cause.source();
    }
    println!("{}", err_msg);
    exit(1);
}

fn main() {
    env_logger::init();

    let app_id = ClientId::new(env::var("APP_ID").expect("Missing the APP_ID environment variable."));
    let app_secret = AppSecret::new(
        env::var("APP_SECRET").expect("Missing the APP_SECRET environment variable."),
    );

    if let Ok(raw) = env::var("SIGNED_REQUEST") {
        match signed_request::verified_payload(Some(&raw), &app_secret) {
            Ok(payload) => println!(
                "Signed request is valid. Payload:\n{}\n",
                serde_json::to_string_pretty(payload.as_map()).unwrap()
            ),
            Err(err) => handle_error(&err, "Signed request rejected"),
        }
    }

    let config = FacebookConfig::new(
        app_id,
        app_secret,
        RouteName::new(CALLBACK_ROUTE.to_string()),
    )
    .add_permission(Scope::new("email".to_string()))
    .add_permission(Scope::new("public_profile".to_string()));
    let url_generator = StaticUrlGenerator::new(Url::parse("http://localhost:8080/").unwrap())
        .add_route(RouteName::new(CALLBACK_ROUTE.to_string()), "/callback");

    let http_client = reqwest::blocking::ClientBuilder::new()
        // Following redirects opens the client up to SSRF vulnerabilities.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|err| handle_error(&err, "Failed to build HTTP client"));

    let mut service = FacebookService::new(
        config,
        MemorySession::new(),
        url_generator,
        RecordingDispatcher::new(),
    );

    let authorize_url = service
        .authorization_url_with_state()
        .unwrap_or_else(|err| handle_error(&err, "Failed to build authorization URL"));
    println!("Open this URL in your browser:\n{}\n", authorize_url);

    let mut request = {
        // A very naive implementation of the redirect server.
        let listener = TcpListener::bind("127.0.0.1:8080").unwrap();

        // Accept one connection
        let (mut stream, _) = listener.accept().unwrap();

        let mut reader = BufReader::new(&stream);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let redirect_url = request_line.split_whitespace().nth(1).unwrap();
        let url = Url::parse(&("http://localhost".to_string() + redirect_url)).unwrap();

        let message = "Go back to your terminal :)";
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
            message.len(),
            message
        );
        stream.write_all(response.as_bytes()).unwrap();

        let route = (url.path() == "/callback").then(|| RouteName::new(CALLBACK_ROUTE.to_string()));
        InboundRequest::new()
            .set_route(route)
            .set_query_string(url.query().unwrap_or_default())
    };

    service
        .on_request(&mut request, &http_client)
        .unwrap_or_else(|err| handle_error(&err, "Failed to complete the login"));

    for event in service.dispatcher_mut().take_events() {
        if let FacebookEvent::UserInfo(user_data) = event {
            println!(
                "Facebook returned the following user data:\n{}",
                serde_json::to_string_pretty(&user_data).unwrap()
            );
        }
    }
}
