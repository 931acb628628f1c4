use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::clients::is_transient;
use crate::config::AuthConfig;
use crate::models::IdentityClaims;
use crate::utils::retry::{with_retry, RetryConfig};

const JWKS_CACHE_TTL_SECS: i64 = 3600; // 1 hour

/// Verifies bearer identity tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Check the token's signature and validity window and return its claims.
    async fn verify(&self, token: &str) -> Result<IdentityClaims>;
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Default)]
struct JwksCache {
    keys: HashMap<String, Jwk>,
    fetched_at: Option<DateTime<Utc>>,
}

impl JwksCache {
    fn is_expired(&self) -> bool {
        match self.fetched_at {
            Some(t) => Utc::now() - t > Duration::seconds(JWKS_CACHE_TTL_SECS),
            None => true,
        }
    }
}

/// RS256 OpenID identity-token verifier backed by the issuer's published
/// JWKS. Keys are cached and refetched when the cache expires or an unknown
/// key id shows up.
pub struct OidcVerifier {
    issuer: String,
    audience: String,
    jwks_url: String,
    http: reqwest::Client,
    retry: RetryConfig,
    cache: RwLock<JwksCache>,
}

impl OidcVerifier {
    pub fn new(http: reqwest::Client, config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            jwks_url: config.jwks_url.clone(),
            http,
            retry: RetryConfig::default(),
            cache: RwLock::new(JwksCache::default()),
        }
    }

    async fn signing_key(&self, kid: &str) -> Result<Jwk> {
        {
            if let Ok(cache) = self.cache.read() {
                if !cache.is_expired() {
                    if let Some(key) = cache.keys.get(kid) {
                        debug!("Using cached JWKS key for kid={}", kid);
                        return Ok(key.clone());
                    }
                }
            }
        }

        let document = self.fetch_jwks().await?;

        if let Ok(mut cache) = self.cache.write() {
            cache.keys = document
                .keys
                .iter()
                .map(|k| (k.kid.clone(), k.clone()))
                .collect();
            cache.fetched_at = Some(Utc::now());
        }

        document
            .keys
            .into_iter()
            .find(|k| k.kid == kid)
            .ok_or_else(|| anyhow!("no JWKS key published for kid={kid}"))
    }

    async fn fetch_jwks(&self) -> Result<JwksDocument> {
        debug!("fetching: {}", self.jwks_url);

        let response = with_retry(&self.retry, is_transient, || {
            self.http.get(&self.jwks_url).send()
        })
        .await
        .context("JWKS fetch failed")?;

        if !response.status().is_success() {
            bail!("JWKS endpoint returned {}", response.status());
        }

        response
            .json::<JwksDocument>()
            .await
            .context("malformed JWKS document")
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims> {
        let header = decode_header(token).context("malformed token header")?;
        let kid = header
            .kid
            .ok_or_else(|| anyhow!("token header missing kid"))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .context("invalid RSA components in JWKS key")?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;

        let data = decode::<IdentityClaims>(token, &key, &validation)
            .context("token verification failed")?;

        // jsonwebtoken checks exp; the lower bound of the validity window is
        // on us.
        let now = Utc::now().timestamp();
        if data.claims.iat > now {
            bail!("token issued in the future (iat={} now={})", data.claims.iat, now);
        }

        Ok(data.claims)
    }
}
