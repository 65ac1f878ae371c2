use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use reqwest::header::CACHE_CONTROL;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use super::IdentityError;

/// Used when the key endpoint does not send `Cache-Control: max-age`.
const DEFAULT_KEYS_TTL: Duration = Duration::from_secs(60 * 60);
/// Upper bound on how long a key set is trusted, whatever the endpoint announces.
const MAX_KEYS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    expires_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Public keys that sign ID tokens, indexed by `kid`.
///
/// Keys are refetched once the `max-age` announced by the key endpoint runs out.
/// Only key material lives here; nothing request-scoped.
pub struct KeyStore {
    http: reqwest::Client,
    url: Url,
    cached: RwLock<Option<CachedKeys>>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("url", &self.url.as_str())
            .finish()
    }
}

impl KeyStore {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self {
            http,
            url,
            cached: RwLock::new(None),
        }
    }

    /// Look up the key for `kid`, fetching the key set if the cache is empty or stale.
    ///
    /// `Ok(None)` means the key set is current but does not contain `kid`.
    pub async fn decoding_key(&self, kid: &str) -> Result<Option<DecodingKey>, IdentityError> {
        {
            let guard = self.cached.read().await;
            if let Some(cached) = guard.as_ref()
                && cached.is_fresh(Instant::now())
            {
                return Ok(cached.keys.get(kid).cloned());
            }
        }

        let mut guard = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(cached) = guard.as_ref()
            && cached.is_fresh(Instant::now())
        {
            return Ok(cached.keys.get(kid).cloned());
        }

        let fresh = self.fetch().await?;
        let key = fresh.keys.get(kid).cloned();
        *guard = Some(fresh);

        Ok(key)
    }

    async fn fetch(&self) -> Result<CachedKeys, IdentityError> {
        let res = self.http.get(self.url.clone()).send().await?;

        if !res.status().is_success() {
            return Err(IdentityError::Keys(format!(
                "key endpoint answered {}",
                res.status()
            )));
        }

        let ttl = keys_ttl(
            res.headers()
                .get(CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
        );

        let set: JwkSet = res
            .json()
            .await
            .map_err(|e| IdentityError::Keys(e.to_string()))?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!(kid = %kid, error = %e, "skipping unusable signing key"),
            }
        }

        if keys.is_empty() {
            return Err(IdentityError::Keys("key set is empty".to_string()));
        }

        debug!(count = keys.len(), ttl_seconds = ttl.as_secs(), "loaded signing keys");

        Ok(CachedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }
}

/// Cache lifetime for a fetched key set, capped at `MAX_KEYS_TTL`.
fn keys_ttl(cache_control: Option<&str>) -> Duration {
    cache_control
        .and_then(max_age)
        .unwrap_or(DEFAULT_KEYS_TTL)
        .min(MAX_KEYS_TTL)
}

/// Parse `max-age=<seconds>` out of a Cache-Control header value.
fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("max-age"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
