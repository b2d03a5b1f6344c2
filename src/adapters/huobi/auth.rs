//! Huobi Authentication - HMAC-SHA256 Request Signing
//!
//! Signs REST requests with signature version 2: the auth parameters are
//! merged into the query, everything is sorted by key and
//! percent-encoded (spaces as `%20`), and the canonical string
//! `METHOD\nhost\npath\nquery` is signed with the API secret.

use std::collections::BTreeMap;

use base64::Engine;
use chrono::{DateTime, Utc};
use url::form_urlencoded;

/// Timestamp layout the venue expects, always UTC.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Request signer for one API key.
pub struct HuobiSigner {
    /// API key, sent as `AccessKeyId`.
    access_key: String,
    /// API secret (never sent).
    secret: String,
    /// Lowercase venue host, part of the canonical string.
    host: String,
}

impl HuobiSigner {
    pub fn new(access_key: &str, secret: &str, host: &str) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret: secret.to_string(),
            host: host.to_lowercase(),
        }
    }

    /// Format a UTC instant the way the venue expects.
    pub fn timestamp(at: DateTime<Utc>) -> String {
        at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Add the auth parameters to `params` for a request issued at `at`.
    pub fn add_auth_params(&self, params: &mut BTreeMap<String, String>, at: DateTime<Utc>) {
        params.insert("AccessKeyId".to_string(), self.access_key.clone());
        params.insert("SignatureMethod".to_string(), "HmacSHA256".to_string());
        params.insert("SignatureVersion".to_string(), "2".to_string());
        params.insert("Timestamp".to_string(), Self::timestamp(at));
    }

    /// Sign an already-sorted, already-encoded query string.
    pub fn sign(&self, method: &str, path: &str, encoded_query: &str) -> String {
        let payload = format!(
            "{}\n{}\n{}\n{}",
            method.to_uppercase(),
            self.host,
            path,
            encoded_query
        );
        let mac = hmac_sha256::HMAC::mac(payload.as_bytes(), self.secret.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac)
    }

    /// Build the full signed query string (auth params, business params,
    /// and the trailing `Signature`).
    pub fn signed_query(
        &self,
        method: &str,
        path: &str,
        mut params: BTreeMap<String, String>,
        at: DateTime<Utc>,
    ) -> String {
        self.add_auth_params(&mut params, at);
        let query = encode_query(&params);
        let signature = self.sign(method, path, &query);
        let tail = form_urlencoded::Serializer::new(String::new())
            .append_pair("Signature", &signature)
            .finish();
        format!("{query}&{tail}")
    }
}

/// Percent-encode parameters in key order.
///
/// The form serializer writes a space as `+`; the venue signs `%20`.
/// A literal `+` has already become `%2B`, so the swap is unambiguous.
pub fn encode_query(params: &BTreeMap<String, String>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
        .replace('+', "%20")
}
