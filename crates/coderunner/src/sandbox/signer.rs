//! Request signing for the sandbox control plane
//!
//! Requests carry an `Authorization` header computed as HMAC-SHA256 over a
//! canonical form of the request. The signing key is derived from the
//! secret key through the date, region, service and the literal `request`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::types::ControlPlaneError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host;x-content-sha256;x-date";
pub const CONTENT_TYPE: &str = "application/json";

/// Header values to attach to one signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub x_date: String,
    pub x_content_sha256: String,
    pub authorization: String,
}

/// Signs control-plane requests with an access key pair
#[derive(Clone)]
pub struct RequestSigner {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

impl RequestSigner {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign a request to path `/` on `host`.
    ///
    /// `query` may be in any order; it is sorted by key before signing.
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        query: &[(&str, &str)],
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignedRequest, ControlPlaneError> {
        let x_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let short_date = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(body));

        let canonical_headers = format!(
            "content-type:{}\nhost:{}\nx-content-sha256:{}\nx-date:{}\n",
            CONTENT_TYPE, host, payload_hash, x_date
        );
        let method = method.to_uppercase();
        let query = canonical_query(query);
        let canonical_request = [
            method.as_str(),
            "/",
            query.as_str(),
            canonical_headers.as_str(),
            SIGNED_HEADERS,
            payload_hash.as_str(),
        ]
        .join("\n");

        let scope = format!("{}/{}/{}/request", short_date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            x_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let k_date = hmac(self.secret_key.as_bytes(), short_date.as_bytes())?;
        let k_region = hmac(&k_date, self.region.as_bytes())?;
        let k_service = hmac(&k_region, self.service.as_bytes())?;
        let k_signing = hmac(&k_service, b"request")?;
        let signature = hex::encode(hmac(&k_signing, string_to_sign.as_bytes())?);

        Ok(SignedRequest {
            authorization: format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.access_key, scope, SIGNED_HEADERS, signature
            ),
            x_date,
            x_content_sha256: payload_hash,
        })
    }
}

/// Sorted, percent-encoded query string
pub fn canonical_query(query: &[(&str, &str)]) -> String {
    let mut pairs: Vec<_> = query.to_vec();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ControlPlaneError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| ControlPlaneError::Signing {
        reason: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
