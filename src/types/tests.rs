use crate::{AppSecret, GraphUrl, RouteName};

use pretty_assertions::assert_eq;

#[test]
fn test_graph_url_endpoint() {
    assert_eq!(
        "https://graph.facebook.com/me/albums",
        GraphUrl::new("https://graph.facebook.com".to_string())
            .unwrap()
            .endpoint(&["me", "albums"])
            .unwrap()
            .to_string()
    );
    assert_eq!(
        "https://graph.facebook.com/me/albums",
        GraphUrl::new("https://graph.facebook.com/".to_string())
            .unwrap()
            .endpoint(&["me", "albums"])
            .unwrap()
            .to_string()
    );
    assert_eq!(
        "https://example.com/v2.0/12345/photos",
        GraphUrl::new("https://example.com/v2.0/".to_string())
            .unwrap()
            .endpoint(&["12345", "photos"])
            .unwrap()
            .to_string()
    );
}

#[test]
fn test_graph_url_endpoint_escapes_segments() {
    assert_eq!(
        "https://graph.facebook.com/..%2Fadmin%3Fx=1/photos",
        GraphUrl::new("https://graph.facebook.com/".to_string())
            .unwrap()
            .endpoint(&["../admin?x=1", "photos"])
            .unwrap()
            .to_string()
    );
}

#[test]
fn test_graph_url_serialize() {
    let graph_url = GraphUrl::new("https://graph.facebook.com/".to_string()).unwrap();
    let serialized_url = serde_json::to_string(&graph_url).unwrap();

    assert_eq!("\"https://graph.facebook.com/\"", serialized_url);

    let deserialized_url = serde_json::from_str(&serialized_url).unwrap();
    assert_eq!(graph_url, deserialized_url);

    assert!(serde_json::from_str::<GraphUrl>("\"not a url\"").is_err());
}

#[test]
fn test_app_secret_redacted() {
    let secret = AppSecret::new("s3cret".to_string());
    assert_eq!(format!("{:?}", secret), "AppSecret([redacted])");
    assert_eq!(secret.secret(), "s3cret");
    assert_eq!(secret, AppSecret::new("s3cret".to_string()));
    assert_ne!(secret, AppSecret::new("s3cret!".to_string()));
}

#[test]
fn test_route_name_deref() {
    let route = RouteName::new("facebook_callback".to_string());
    assert_eq!(route.as_str(), "facebook_callback");
    assert_eq!(AsRef::<str>::as_ref(&route), "facebook_callback");
}
