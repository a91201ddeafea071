//! The inbound side of a launch: method, absolute URL, form body and the
//! visitor's session.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, header},
};
use url::{Url, form_urlencoded};

use crate::config::ConfigError;
use crate::error::LtiError;
use crate::params::LaunchParameters;
use crate::session::{Session, SessionStore};

/// A request as seen by the verifier.
#[derive(Clone, Debug)]
pub struct LaunchRequest {
    pub method: String,
    /// Absolute URL the consumer posted to, including any query string.
    pub url: String,
    /// Decoded `application/x-www-form-urlencoded` body.
    pub form: Vec<(String, String)>,
    pub session: Session,
}

impl LaunchRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            form: Vec::new(),
            session: Session::new(),
        }
    }

    pub fn with_form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        Url::parse(&self.url)
            .map(|url| {
                url.query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Query parameters followed by body parameters.
    pub fn all_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.query_pairs();
        pairs.extend(self.form.iter().cloned());
        pairs
    }

    pub fn launch_parameters(&self) -> LaunchParameters {
        LaunchParameters::from_pairs(self.all_pairs())
    }
}

/// Session wiring the extractor expects in the request extensions.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub store: SessionStore,
    pub cookie_name: String,
}

impl SessionSettings {
    pub fn new(store: SessionStore, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
        }
    }
}

/// Builds the absolute URL the client requested, honouring
/// `X-Forwarded-Proto` from a TLS-terminating proxy.
fn absolute_url(headers: &HeaderMap, uri: &axum::http::Uri) -> Result<String, LtiError> {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .ok_or(LtiError::MissingParameter("Host"))?;
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    Ok(format!("{scheme}://{host}{path}"))
}

fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

impl<S> FromRequest<S> for LaunchRequest
where
    S: Send + Sync,
{
    type Rejection = LtiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let settings = req
            .extensions()
            .get::<SessionSettings>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("SessionSettings not found in extensions");
                LtiError::Config(ConfigError::Validation(
                    "session store is not configured".into(),
                ))
            })?;

        let method = req.method().as_str().to_string();
        let url = absolute_url(req.headers(), req.uri())?;
        let session = settings
            .store
            .load_or_new(session_cookie(req.headers(), &settings.cookie_name));
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| LtiError::InvalidFormat {
                field: "body",
                reason: e.to_string(),
            })?;
        let form = if is_form {
            form_urlencoded::parse(&body).into_owned().collect()
        } else {
            Vec::new()
        };

        Ok(LaunchRequest {
            method,
            url,
            form,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Uri};

    #[test]
    fn absolute_url_prefers_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("tool.example.edu"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        let uri: Uri = "/lti/?x=1".parse().unwrap();
        assert_eq!(
            absolute_url(&headers, &uri).unwrap(),
            "https://tool.example.edu/lti/?x=1"
        );
    }

    #[test]
    fn absolute_url_requires_host() {
        let uri: Uri = "/lti/".parse().unwrap();
        assert!(matches!(
            absolute_url(&HeaderMap::new(), &uri),
            Err(LtiError::MissingParameter("Host"))
        ));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; lti_session=abc123; other=1"),
        );
        assert_eq!(session_cookie(&headers, "lti_session"), Some("abc123"));
        assert_eq!(session_cookie(&headers, "missing"), None);
    }

    #[test]
    fn launch_parameters_merge_query_and_form() {
        let request = LaunchRequest::new("POST", "http://testserver/lti/?context_id=c1")
            .with_form([("user_id", "student_one")]);
        let params = request.launch_parameters();
        assert_eq!(params.context_id.as_deref(), Some("c1"));
        assert_eq!(params.user_id.as_deref(), Some("student_one"));
        assert_eq!(request.all_pairs().len(), 2);
    }
}
