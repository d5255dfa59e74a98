use http::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE,
};
use oauth2::AccessToken;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

pub const MIME_TYPE_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MIME_TYPE_JSON: &str = "application/json";
// The Graph API historically labels JSON responses as JavaScript.
pub const MIME_TYPE_JAVASCRIPT: &str = "text/javascript";
pub const MIME_TYPE_OCTET_STREAM: &str = "application/octet-stream";

pub const BEARER: &str = "Bearer";

pub fn header_starts_with_ignoring_case(header: &HeaderValue, expected_start: &str) -> bool {
    header
        .to_str()
        .ok()
        .filter(|ct| ct.to_lowercase().starts_with(&expected_start.to_lowercase()))
        .is_some()
}

pub fn check_content_type(
    headers: &HeaderMap,
    expected_content_types: &[&str],
) -> Result<(), String> {
    headers
        .get(CONTENT_TYPE)
        .map_or(Ok(()), |content_type|
            // Section 3.1.1.1 of RFC 7231 indicates that media types are case insensitive and
            // may be followed by optional whitespace and/or a parameter (e.g., charset).
            // See https://tools.ietf.org/html/rfc7231#section-3.1.1.1.
            if !expected_content_types
                .iter()
                .any(|expected| header_starts_with_ignoring_case(content_type, expected))
            {
                Err(
                    format!(
                        "Unexpected response Content-Type: {:?}, should be one of `{}`",
                        content_type,
                        expected_content_types.join("`, `")
                    )
                )
            } else {
                Ok(())
            }
        )
}

pub fn auth_bearer(
    access_token: &AccessToken,
) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("{} {}", BEARER, access_token.secret()))?;
    value.set_sensitive(true);
    Ok((AUTHORIZATION, value))
}

pub fn form_urlencoded<'a, I>(fields: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
        .into_bytes()
}

/// Minimal `multipart/form-data` encoder for Graph API uploads.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}
impl MultipartForm {
    pub fn new() -> Self {
        let boundary = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect::<String>();
        Self::with_boundary(format!("fb-canvas-{}", boundary))
    }

    pub fn with_boundary(boundary: String) -> Self {
        MultipartForm {
            boundary,
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quoted(name)
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: {}\r\n\r\n",
                escape_quoted(name),
                escape_quoted(file_name),
                content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (self.content_type(), self.body)
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}
