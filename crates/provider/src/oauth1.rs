//! OAuth 1.0a HMAC-SHA1 request signing (RFC 5849) as used by LTI 1.x.
//!
//! Only the consumer-key/secret flavour is supported: LTI launches carry no
//! token, so the signing key is always `encode(secret) + "&"`.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use url::Url;

use crate::consumer::Consumer;
use crate::error::SignatureError;
use crate::request::LaunchRequest;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

/// Checks that a launch was signed by the consumer it claims to come from.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, request: &LaunchRequest, consumer: &Consumer) -> Result<(), SignatureError>;
}

/// Default verifier: HMAC-SHA1 with a timestamp window.
#[derive(Clone, Debug)]
pub struct HmacSha1Verifier {
    timestamp_threshold: i64,
}

impl Default for HmacSha1Verifier {
    fn default() -> Self {
        Self::new(300)
    }
}

impl HmacSha1Verifier {
    pub fn new(timestamp_threshold: i64) -> Self {
        Self {
            timestamp_threshold,
        }
    }

    /// Verifies `request` as if the current time were `now` (unix seconds).
    pub fn verify_at(
        &self,
        request: &LaunchRequest,
        consumer: &Consumer,
        now: i64,
    ) -> Result<(), SignatureError> {
        let params = request.all_pairs();
        let lookup = |name: &'static str| {
            params
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        let required =
            |name: &'static str| lookup(name).ok_or(SignatureError::MissingOAuthParameter(name));

        let method = required("oauth_signature_method")?;
        if method != SIGNATURE_METHOD {
            return Err(SignatureError::UnsupportedMethod(method.to_string()));
        }
        if let Some(version) = lookup("oauth_version") {
            if version != OAUTH_VERSION {
                return Err(SignatureError::UnsupportedVersion(version.to_string()));
            }
        }
        required("oauth_nonce")?;
        let provided = required("oauth_signature")?;

        let raw_timestamp = required("oauth_timestamp")?;
        let timestamp: i64 = raw_timestamp
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp(raw_timestamp.to_string()))?;
        if now.abs_diff(timestamp) > self.timestamp_threshold.unsigned_abs() {
            return Err(SignatureError::StaleTimestamp {
                timestamp,
                threshold: self.timestamp_threshold,
            });
        }

        let expected = sign(&request.method, &request.url, &request.form, &consumer.secret)?;
        if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            tracing::debug!(consumer = %consumer.key, "OAuth signature mismatch");
            Err(SignatureError::Mismatch)
        }
    }
}

impl SignatureVerifier for HmacSha1Verifier {
    fn verify(&self, request: &LaunchRequest, consumer: &Consumer) -> Result<(), SignatureError> {
        self.verify_at(request, consumer, OffsetDateTime::now_utc().unix_timestamp())
    }
}

/// Computes the base64 HMAC-SHA1 signature of a request.
///
/// `params` are the decoded body parameters; query parameters are taken from
/// `url`. Any `oauth_signature` entry is ignored.
pub fn sign(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
) -> Result<String, SignatureError> {
    let base = signature_base_string(method, url, params)?;
    let key = format!("{}&", percent_encode(consumer_secret));
    let mut mac =
        <HmacSha1 as Mac>::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Adds the `oauth_*` fields to `params` and signs them, the way a tool
/// consumer prepares a launch form.
pub fn sign_launch(
    method: &str,
    url: &str,
    params: &mut Vec<(String, String)>,
    consumer_key: &str,
    consumer_secret: &str,
    timestamp: i64,
) -> Result<(), SignatureError> {
    params.retain(|(k, _)| !k.starts_with("oauth_"));
    params.extend([
        ("oauth_consumer_key".to_string(), consumer_key.to_string()),
        ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_nonce".to_string(), uuid::Uuid::new_v4().simple().to_string()),
        ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
    ]);
    let signature = sign(method, url, params, consumer_secret)?;
    params.push(("oauth_signature".to_string(), signature));
    Ok(())
}

/// RFC 5849 section 3.4.1 signature base string.
pub fn signature_base_string(
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, SignatureError> {
    let parsed = Url::parse(url).map_err(|e| SignatureError::InvalidUrl(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| SignatureError::InvalidUrl(format!("{url} has no host")))?;
    // `Url` lowercases scheme and host and drops default ports.
    let base_url = match parsed.port() {
        Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, parsed.path()),
        None => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
    };

    let mut encoded: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .chain(params.iter().cloned())
        .filter(|(k, _)| k != "oauth_signature")
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_url),
        percent_encode(&normalized)
    ))
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn percent_encoding_follows_rfc3986() {
        assert_eq!(percent_encode("abc-._~"), "abc-._~");
        assert_eq!(percent_encode("a b+c"), "a%20b%2Bc");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    #[test]
    fn base_string_normalizes_url_and_params() {
        let base = signature_base_string(
            "post",
            "HTTP://Example.COM:80/lti/?b=2",
            &pairs(&[("a", "1"), ("oauth_signature", "ignored"), ("c", "x y")]),
        )
        .unwrap();
        assert_eq!(
            base,
            "POST&http%3A%2F%2Fexample.com%2Flti%2F&a%3D1%26b%3D2%26c%3Dx%2520y"
        );
    }

    #[test]
    fn signature_depends_on_secret() {
        let params = pairs(&[
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1191242090"),
            ("oauth_nonce", "hsu94j3884jdopsl"),
            ("oauth_version", "1.0"),
        ]);
        let a = sign("POST", "https://photos.example.net/request_token", &params, "kd94hf93k423kf44")
            .unwrap();
        let b = sign("POST", "https://photos.example.net/request_token", &params, "kd94hf93k423kf44")
            .unwrap();
        assert_eq!(a, b);
        let other = sign("POST", "https://photos.example.net/request_token", &params, "other")
            .unwrap();
        assert_ne!(a, other);
        // 20 byte digest -> 28 base64 characters
        assert_eq!(a.len(), 28);
    }

    #[test]
    fn sign_launch_replaces_existing_oauth_fields() {
        let mut params = pairs(&[("user_id", "u1"), ("oauth_signature", "stale")]);
        sign_launch("POST", "http://testserver/lti/", &mut params, "key", "secret", 42).unwrap();
        assert_eq!(
            params.iter().filter(|(k, _)| k == "oauth_signature").count(),
            1
        );
        assert!(params.iter().any(|(k, v)| k == "oauth_timestamp" && v == "42"));
    }

    fn consumer() -> Consumer {
        Consumer {
            key: "key".into(),
            secret: "secret".into(),
            name: None,
        }
    }

    fn launch_signed_at(timestamp: i64) -> LaunchRequest {
        let url = "http://testserver/lti/";
        let mut params = pairs(&[("user_id", "u1")]);
        sign_launch("POST", url, &mut params, "key", "secret", timestamp).unwrap();
        LaunchRequest::new("POST", url).with_form(params)
    }

    #[test]
    fn timestamp_inside_window_is_accepted() {
        let now = 1_700_000_000;
        let verifier = HmacSha1Verifier::new(300);
        assert!(verifier.verify_at(&launch_signed_at(now - 299), &consumer(), now).is_ok());
        assert!(verifier.verify_at(&launch_signed_at(now + 299), &consumer(), now).is_ok());
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        let now = 1_700_000_000;
        let verifier = HmacSha1Verifier::new(300);
        for timestamp in [i64::MIN, i64::MAX, now - 301] {
            assert!(matches!(
                verifier.verify_at(&launch_signed_at(timestamp), &consumer(), now),
                Err(SignatureError::StaleTimestamp { timestamp: t, threshold: 300 }) if t == timestamp
            ));
        }
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            signature_base_string("POST", "not a url", &[]),
            Err(SignatureError::InvalidUrl(_))
        ));
    }
}
