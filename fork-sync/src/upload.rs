#![doc = "Object-store integration for the CLI: bridges the core trait abstraction to a real S3-compatible endpoint."]
//
//! # Bucket Client (CLI <-> Core)
//!
//! This module provides the bridge between the CLI workflow and the
//! object-store abstraction in [`fork_sync_core::contract`]. It wires up the
//! `ObjectStore` trait for real use against an S3-compatible HTTP endpoint,
//! and provides the [`S3Client`] used by the CLI for networked uploads.
//!
//! ## Client Usage
//!
//! - Construct [`S3Client`] from environment variables:
//!   `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`,
//!   `S3_BUCKET_NAME` and optionally `S3_ENDPOINT` (defaults to the regional
//!   AWS endpoint). Values are passed through as-is, never format-validated.
//! - Objects are PUT with path-style addressing; the destination key is the
//!   repo-relative file path.
//! - Requests are signed with AWS Signature Version 4 (HMAC-SHA256).
//!
//! All transport, signing and error handling are encapsulated here; the
//! pipeline only sees `put_file` succeed or fail per file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::env;

use fork_sync_core::contract::{ObjectStore, PutRequest, UploadError};

type HmacSha256 = Hmac<Sha256>;

pub struct S3Client {
    http: reqwest::Client,
    endpoint: reqwest::Url,
    region: String,
    bucket: String,
    access_key: String,
    secret_key: String,
}

impl S3Client {
    pub fn new_from_env() -> Result<Self, UploadError> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present

        let access_key = require_env("AWS_ACCESS_KEY_ID")?;
        let secret_key = require_env("AWS_SECRET_ACCESS_KEY")?;
        let region = require_env("AWS_REGION")?;
        let bucket = require_env("S3_BUCKET_NAME")?;
        let endpoint_raw = env::var("S3_ENDPOINT")
            .unwrap_or_else(|_| format!("https://s3.{region}.amazonaws.com"));
        let endpoint = reqwest::Url::parse(&endpoint_raw).map_err(|e| {
            tracing::error!(error = ?e, endpoint = %endpoint_raw, "Invalid S3_ENDPOINT URL");
            Box::new(e) as UploadError
        })?;

        tracing::info!(
            endpoint = %endpoint,
            region = %region,
            bucket = %bucket,
            "Initialized S3Client from environment"
        );
        Ok(S3Client {
            http: reqwest::Client::new(),
            endpoint,
            region,
            bucket,
            access_key,
            secret_key,
        })
    }

    /// Host header value for the endpoint, including any non-default port.
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Canonical URI for path-style access: `/{bucket}/{encoded key}`.
    fn canonical_uri(&self, key: &str) -> String {
        format!("/{}/{}", uri_encode(&self.bucket), uri_encode(key))
    }

    /// Computes the SigV4 `Authorization` header and `x-amz-date` value for
    /// one request.
    fn sign(
        &self,
        method: &str,
        canonical_uri: &str,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> SignedHeaders {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let host = self.host();
        let scope = format!("{date}/{}/s3/aws4_request", self.region);

        let canonical_request = format!(
            "{method}\n{canonical_uri}\n\nhost:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n\nhost;x-amz-content-sha256;x-amz-date\n{payload_hash}"
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key = {
            let k_date = hmac_sha256(format!("AWS4{}", self.secret_key).as_bytes(), &date);
            let k_region = hmac_sha256(&k_date, &self.region);
            let k_service = hmac_sha256(&k_region, "s3");
            hmac_sha256(&k_service, "aws4_request")
        };
        let signature = {
            let mut mac = HmacSha256::new_from_slice(&signing_key)
                .expect("HMAC accepts keys of any size");
            mac.update(string_to_sign.as_bytes());
            format!("{:x}", mac.finalize().into_bytes())
        };

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature={signature}",
            self.access_key
        );
        SignedHeaders {
            amz_date,
            authorization,
        }
    }
}

struct SignedHeaders {
    amz_date: String,
    authorization: String,
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_file<'a>(&self, req: PutRequest<'a>) -> Result<(), UploadError> {
        tracing::info!(
            key = req.key,
            bucket = %self.bucket,
            path = %req.local_path.display(),
            "Uploading file to bucket"
        );

        let body = tokio::fs::read(req.local_path).await.map_err(|e| {
            tracing::error!(error = ?e, path = %req.local_path.display(), "Failed to read local file");
            Box::new(e) as UploadError
        })?;

        let payload_hash = sha256_hex(&body);
        let canonical_uri = self.canonical_uri(req.key);
        let signed = self.sign("PUT", &canonical_uri, &payload_hash, Utc::now());

        let url = format!(
            "{}{}",
            self.endpoint.as_str().trim_end_matches('/'),
            canonical_uri
        );
        let response = self
            .http
            .put(&url)
            .header("host", self.host())
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("authorization", &signed.authorization)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, key = req.key, "Transport error uploading object");
                Box::new(e) as UploadError
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(key = req.key, status = %status, "Successfully stored object");
            Ok(())
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to decode response body>"));
            tracing::error!(key = req.key, status = %status, body = %text, "Bucket rejected object");
            Err(format!("bucket returned {status} for key {}: {text}", req.key).into())
        }
    }
}

fn require_env(name: &str) -> Result<String, UploadError> {
    env::var(name).map_err(|e| {
        tracing::error!(var = name, "Required environment variable missing");
        Box::new(e) as UploadError
    })
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// RFC 3986 encoding with `/` preserved, as SigV4 requires for object keys.
fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_client() -> S3Client {
        S3Client {
            http: reqwest::Client::new(),
            endpoint: reqwest::Url::parse("http://localhost:9000").unwrap(),
            region: "us-east-1".to_string(),
            bucket: "docs".to_string(),
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "secret".to_string(),
        }
    }

    #[test]
    fn uri_encode_preserves_slashes_and_escapes_spaces() {
        assert_eq!(uri_encode("docs/report.pdf"), "docs/report.pdf");
        assert_eq!(uri_encode("a b/c.pdf"), "a%20b/c.pdf");
        assert_eq!(uri_encode("ün.pdf"), "%C3%BCn.pdf");
    }

    #[test]
    fn host_includes_non_default_port() {
        let client = test_client();
        assert_eq!(client.host(), "localhost:9000");
    }

    #[test]
    fn canonical_uri_is_path_style() {
        let client = test_client();
        assert_eq!(
            client.canonical_uri("docs/report.pdf"),
            "/docs/docs/report.pdf"
        );
    }

    #[test]
    fn sign_produces_wellformed_authorization_header() {
        let client = test_client();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let signed = client.sign("PUT", "/docs/report.pdf", &sha256_hex(b"body"), now);

        assert_eq!(signed.amz_date, "20240501T120000Z");
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240501/us-east-1/s3/aws4_request"
        ));
        assert!(signed
            .authorization
            .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        let signature = signed
            .authorization
            .rsplit("Signature=")
            .next()
            .unwrap()
            .to_string();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signing_is_deterministic_for_fixed_inputs() {
        let client = test_client();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let hash = sha256_hex(b"body");
        let a = client.sign("PUT", "/docs/report.pdf", &hash, now);
        let b = client.sign("PUT", "/docs/report.pdf", &hash, now);
        assert_eq!(a.authorization, b.authorization);
    }
}
