//! Credentials applied to every outgoing attempt.
//!
//! Authentication runs again for each retry, so credentials that produce
//! attempt-specific headers (fresh tokens, signatures) stay valid.

use reqwest::RequestBuilder;

/// Adds authentication to an outgoing request.
///
/// # Examples
///
/// ```
/// use ratewise::Credentials;
/// use reqwest::RequestBuilder;
///
/// struct ApiKey(String);
///
/// impl Credentials for ApiKey {
///     fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
///         request.header("x-api-key", &self.0)
///     }
/// }
/// ```
pub trait Credentials: Send + Sync {
    /// Returns `request` with authentication applied.
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder;

    /// The name of the authenticated user, if there is one.
    fn logon_name(&self) -> Option<&str> {
        None
    }
}

/// HTTP basic authentication.
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    /// Creates basic credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials for BasicCredentials {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    fn logon_name(&self) -> Option<&str> {
        Some(&self.username)
    }
}

/// Bearer token authentication.
#[derive(Clone)]
pub struct BearerCredentials {
    token: String,
}

impl BearerCredentials {
    /// Creates bearer credentials from a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for BearerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials for BearerCredentials {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }
}

/// No authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousCredentials;

impl Credentials for AnonymousCredentials {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::AUTHORIZATION;

    fn authorization(credentials: &dyn Credentials) -> Option<String> {
        let request = reqwest::Client::new().get("https://jira.example.com/rest/api/2/myself");
        let built = credentials.authenticate(request).build().unwrap();
        built
            .headers()
            .get(AUTHORIZATION)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn test_basic_credentials() {
        let credentials = BasicCredentials::new("user", "pass");
        assert_eq!(authorization(&credentials).as_deref(), Some("Basic dXNlcjpwYXNz"));
        assert_eq!(credentials.logon_name(), Some("user"));
    }

    #[test]
    fn test_bearer_credentials() {
        let credentials = BearerCredentials::new("t0k3n");
        assert_eq!(authorization(&credentials).as_deref(), Some("Bearer t0k3n"));
        assert_eq!(credentials.logon_name(), None);
    }

    #[test]
    fn test_anonymous_credentials_add_nothing() {
        assert_eq!(authorization(&AnonymousCredentials), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", BasicCredentials::new("user", "hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
