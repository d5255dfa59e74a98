use crate::{AppSecret, AuthUrl, ClientId, GraphClient, GraphUrl, RouteName, Scope, TokenUrl};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

///
/// Configuration of a Facebook app integration.
///
/// The configuration is deserializable so that hosts can load it from their own settings
/// (e.g., a JSON or TOML file). Only `app_id`, `app_secret`, and `redirect_route` are
/// required; the endpoint URLs default to Facebook's production endpoints.
///
/// # Example
///
/// ```
/// use fb_canvas::FacebookConfig;
///
/// let config: FacebookConfig = serde_json::from_str(
///     r#"{
///         "app_id": "1234",
///         "app_secret": "s3cret",
///         "permissions": ["email", "user_photos"],
///         "redirect_route": "facebook_callback"
///     }"#,
/// )
/// .unwrap();
/// assert_eq!(config.permissions().len(), 2);
/// ```
///
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct FacebookConfig {
    app_id: ClientId,
    app_secret: AppSecret,
    #[serde(default)]
    permissions: Vec<Scope>,
    redirect_route: RouteName,
    #[serde(default)]
    graph_url: Option<GraphUrl>,
    #[serde(default)]
    dialog_url: Option<AuthUrl>,
    #[serde(default)]
    token_url: Option<TokenUrl>,
}
impl FacebookConfig {
    /// Creates a configuration with no permissions and the default Facebook endpoints.
    pub fn new(app_id: ClientId, app_secret: AppSecret, redirect_route: RouteName) -> Self {
        Self {
            app_id,
            app_secret,
            permissions: Vec::new(),
            redirect_route,
            graph_url: None,
            dialog_url: None,
            token_url: None,
        }
    }

    /// Sets the permissions (OAuth scopes) requested during authorization.
    pub fn set_permissions(mut self, permissions: Vec<Scope>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Appends a permission to request during authorization.
    pub fn add_permission(mut self, permission: Scope) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Overrides the Graph API base URL.
    pub fn set_graph_url(mut self, graph_url: Option<GraphUrl>) -> Self {
        self.graph_url = graph_url;
        self
    }

    /// Overrides the OAuth dialog URL.
    pub fn set_dialog_url(mut self, dialog_url: Option<AuthUrl>) -> Self {
        self.dialog_url = dialog_url;
        self
    }

    /// Overrides the OAuth token endpoint URL.
    pub fn set_token_url(mut self, token_url: Option<TokenUrl>) -> Self {
        self.token_url = token_url;
        self
    }

    /// Returns the app ID.
    pub fn app_id(&self) -> &ClientId {
        &self.app_id
    }

    /// Returns the app secret.
    pub fn app_secret(&self) -> &AppSecret {
        &self.app_secret
    }

    /// Returns the requested permissions.
    pub fn permissions(&self) -> &[Scope] {
        &self.permissions
    }

    /// Returns the host route Facebook redirects to after authorization.
    pub fn redirect_route(&self) -> &RouteName {
        &self.redirect_route
    }

    /// Returns the Graph API base URL override, if any.
    pub fn graph_url(&self) -> Option<&GraphUrl> {
        self.graph_url.as_ref()
    }

    /// Returns the OAuth dialog URL override, if any.
    pub fn dialog_url(&self) -> Option<&AuthUrl> {
        self.dialog_url.as_ref()
    }

    /// Returns the OAuth token endpoint URL override, if any.
    pub fn token_url(&self) -> Option<&TokenUrl> {
        self.token_url.as_ref()
    }

    /// Builds a Graph API client for this app.
    pub fn graph_client(&self) -> GraphClient {
        GraphClient::new(self.app_id.clone(), self.app_secret.clone())
            .set_graph_url(self.graph_url.clone())
            .set_dialog_url(self.dialog_url.clone())
            .set_token_url(self.token_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::{AppSecret, ClientId, FacebookConfig, GraphUrl, RouteName, Scope};

    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_minimal() {
        let config: FacebookConfig = serde_json::from_str(
            "{\"app_id\":\"1234\",\"app_secret\":\"s3cret\",\"redirect_route\":\"callback\"}",
        )
        .unwrap();

        assert_eq!(config.app_id(), &ClientId::new("1234".to_string()));
        assert_eq!(config.app_secret().secret(), "s3cret");
        assert_eq!(
            config.redirect_route(),
            &RouteName::new("callback".to_string())
        );
        assert!(config.permissions().is_empty());
        assert_eq!(config.graph_url(), None);
        assert_eq!(config.dialog_url(), None);
        assert_eq!(config.token_url(), None);

        assert_eq!(
            config.graph_client().app_id(),
            &ClientId::new("1234".to_string())
        );
    }

    #[test]
    fn test_deserialize_full() {
        let config: FacebookConfig = serde_json::from_str(
            "{\
                \"app_id\":\"1234\",\
                \"app_secret\":\"s3cret\",\
                \"permissions\":[\"email\",\"user_photos\"],\
                \"redirect_route\":\"callback\",\
                \"graph_url\":\"https://graph.example.com/v2.0/\",\
                \"dialog_url\":\"https://www.example.com/dialog/oauth\",\
                \"token_url\":\"https://graph.example.com/oauth/access_token\"\
            }",
        )
        .unwrap();

        assert_eq!(
            config.permissions(),
            &[
                Scope::new("email".to_string()),
                Scope::new("user_photos".to_string())
            ]
        );
        assert_eq!(
            config.graph_url(),
            Some(&GraphUrl::new("https://graph.example.com/v2.0/".to_string()).unwrap())
        );
        assert_eq!(
            config.dialog_url().map(|url| url.as_str()),
            Some("https://www.example.com/dialog/oauth")
        );
        assert_eq!(
            config.token_url().map(|url| url.as_str()),
            Some("https://graph.example.com/oauth/access_token")
        );
    }

    #[test]
    fn test_deserialize_missing_secret() {
        assert!(serde_json::from_str::<FacebookConfig>(
            "{\"app_id\":\"1234\",\"redirect_route\":\"callback\"}"
        )
        .is_err());
    }

    #[test]
    fn test_builder() {
        let config = FacebookConfig::new(
            ClientId::new("1234".to_string()),
            AppSecret::new("s3cret".to_string()),
            RouteName::new("callback".to_string()),
        )
        .add_permission(Scope::new("email".to_string()))
        .add_permission(Scope::new("publish_actions".to_string()));

        assert_eq!(config.permissions().len(), 2);

        let serialized = serde_json::to_string(&config).unwrap();
        assert_eq!(
            serialized,
            "{\"app_id\":\"1234\",\"app_secret\":\"s3cret\",\
             \"permissions\":[\"email\",\"publish_actions\"],\"redirect_route\":\"callback\"}"
        );
        assert_eq!(
            serde_json::from_str::<FacebookConfig>(&serialized).unwrap(),
            config
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = FacebookConfig::new(
            ClientId::new("1234".to_string()),
            AppSecret::new("s3cret".to_string()),
            RouteName::new("callback".to_string()),
        );
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
