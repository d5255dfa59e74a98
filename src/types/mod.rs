use serde::{Deserialize, Serialize};
use url::Url;

#[cfg(test)]
mod tests;

new_secret_type![
    /// Application secret shared between Facebook and the app.
    ///
    /// The secret keys the HMAC-SHA256 signature of every signed request and authenticates the
    /// app when exchanging OAuth codes for access tokens.
    #[derive(Clone, Deserialize, Serialize)]
    AppSecret(String)
];

new_type![
    /// Identifier of a photo album owned by the current user.
    #[derive(Deserialize, Hash, Ord, PartialOrd, Serialize)]
    AlbumId(String)
];

new_type![
    /// Identifier of a Facebook page (e.g., the page hosting a page tab app).
    #[derive(Deserialize, Hash, Ord, PartialOrd, Serialize)]
    PageId(String)
];

new_type![
    /// App-scoped identifier of a Facebook user.
    #[derive(Deserialize, Hash, Ord, PartialOrd, Serialize)]
    UserId(String)
];

new_type![
    /// Name of a route in the host application's router (e.g., `facebook_callback`).
    #[derive(Deserialize, Hash, Ord, PartialOrd, Serialize)]
    RouteName(String)
];

impl AsRef<str> for RouteName {
    fn as_ref(&self) -> &str {
        self
    }
}

new_url_type![
    /// Base URL of the Graph API (e.g., `https://graph.facebook.com/`).
    GraphUrl
    impl {
        /// Builds the URL of a Graph API endpoint by appending the given path segments.
        ///
        /// Each segment is percent-encoded, so object IDs supplied by callers cannot escape the
        /// Graph API path (e.g., via `..` or `?`).
        pub fn endpoint(&self, segments: &[&str]) -> Result<Url, url::ParseError> {
            let mut url = self.0.clone();
            url.path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
                .pop_if_empty()
                .extend(segments);
            Ok(url)
        }
    }
];
