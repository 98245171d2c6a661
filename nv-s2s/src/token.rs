use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::S2sError;

/// Claims carried by a minted S2S token. `iss`/`aud` are restricted to the
/// known internal set; `jti` gives receivers enough to dedupe a replayed
/// token if they choose to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S2sClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Signs outbound S2S tokens. HS256 is the default; swap in an RS256-backed
/// implementation when a KMS key is configured, without touching callers.
pub trait S2sSigner: Send + Sync + 'static {
    fn sign(&self, claims: &S2sClaims) -> Result<String, S2sError>;
}

/// Shared-secret HS256 signer — the default for internal mesh traffic.
pub struct HmacSigner {
    key: EncodingKey,
}

impl HmacSigner {
    pub fn new(secret: &str) -> Self {
        Self { key: EncodingKey::from_secret(secret.as_bytes()) }
    }
}

impl S2sSigner for HmacSigner {
    fn sign(&self, claims: &S2sClaims) -> Result<String, S2sError> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.key).map_err(|e| S2sError::SignFailed(e.to_string()))
    }
}

/// RS256 signer backed by a KMS-managed private key, used when one is
/// configured in place of the shared HS256 secret.
pub struct KmsSigner {
    key: EncodingKey,
    kid: Option<String>,
}

impl KmsSigner {
    pub fn from_rsa_pem(pem: &[u8], kid: Option<String>) -> Result<Self, S2sError> {
        let key = EncodingKey::from_rsa_pem(pem).map_err(|e| S2sError::SignFailed(e.to_string()))?;
        Ok(Self { key, kid })
    }
}

impl S2sSigner for KmsSigner {
    fn sign(&self, claims: &S2sClaims) -> Result<String, S2sError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.kid.clone();
        encode(&header, claims, &self.key).map_err(|e| S2sError::SignFailed(e.to_string()))
    }
}

/// Mints [`S2sClaims`] with a bounded lifetime and hands them to the
/// configured [`S2sSigner`].
pub struct TokenMinter {
    signer: std::sync::Arc<dyn S2sSigner>,
    issuer: String,
    audience: String,
    ttl_secs: u64,
}

impl TokenMinter {
    pub fn new(signer: std::sync::Arc<dyn S2sSigner>, issuer: impl Into<String>, audience: impl Into<String>, ttl_secs: u64) -> Self {
        Self { signer, issuer: issuer.into(), audience: audience.into(), ttl_secs }
    }

    pub fn mint(&self, sub: &str, svc: Option<&str>, scope: Option<&str>) -> Result<String, S2sError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let claims = S2sClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: sub.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
            jti: Uuid::new_v4().to_string(),
            svc: svc.map(str::to_string),
            scope: scope.map(str::to_string),
        };
        self.signer.sign(&claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Validation};

    #[test]
    fn hmac_signer_produces_a_verifiable_token() {
        let minter = TokenMinter::new(std::sync::Arc::new(HmacSigner::new("s3cr3t")), "gateway", "internal-services", 60);
        let token = minter.mint("gateway", None, None).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["internal-services"]);
        let decoded = decode::<S2sClaims>(&token, &jsonwebtoken::DecodingKey::from_secret(b"s3cr3t"), &validation).unwrap();
        assert_eq!(decoded.claims.iss, "gateway");
        assert_eq!(decoded.claims.sub, "gateway");
    }

    #[test]
    fn mint_sets_exp_after_iat_by_ttl() {
        let minter = TokenMinter::new(std::sync::Arc::new(HmacSigner::new("s3cr3t")), "gateway", "internal-services", 120);
        let token = minter.mint("gateway", Some("user"), None).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["internal-services"]);
        validation.insecure_disable_signature_validation();
        let decoded = decode::<S2sClaims>(&token, &jsonwebtoken::DecodingKey::from_secret(b"s3cr3t"), &validation).unwrap();
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 120);
        assert_eq!(decoded.claims.svc.as_deref(), Some("user"));
    }
}
