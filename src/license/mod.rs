//! Entitlement gateway for slotbook.
//!
//! A deployment's license is validated against an external console API. The
//! service owns its own lifetime: it is constructed once per process and
//! caches the verdict for a configurable TTL. Session resolution only
//! depends on the [`EntitlementGateway`] trait, never on how the instance
//! is built.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::LicenseConfig;
use crate::{Result, SlotbookError};

/// Gateway yielding the "has valid license" fact.
///
/// Infrastructure failure here is a hard error by contract: a degraded
/// entitlement subsystem must not silently grant or deny access.
pub trait EntitlementGateway: Send + Sync {
    /// Whether this deployment holds a valid license.
    fn check_license(&self) -> impl Future<Output = Result<bool>> + Send;
}

impl<T: EntitlementGateway> EntitlementGateway for Arc<T> {
    fn check_license(&self) -> impl Future<Output = Result<bool>> + Send {
        (**self).check_license()
    }
}

struct CachedVerdict {
    valid: bool,
    checked_at: Instant,
}

/// License validation client with an in-process verdict cache.
pub struct LicenseService {
    client: Client,
    api_url: String,
    license_key: Option<String>,
    cache_ttl: Duration,
    verdict: Mutex<Option<CachedVerdict>>,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    valid: bool,
}

static INSTANCE: OnceLock<Arc<LicenseService>> = OnceLock::new();

impl LicenseService {
    /// Create a service from configuration.
    pub fn new(config: &LicenseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SlotbookError::Entitlement(format!("failed to create HTTP client: {e}"))
            })?;

        let license_key = if config.key.is_empty() {
            None
        } else {
            Some(config.key.clone())
        };

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            license_key,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            verdict: Mutex::new(None),
        })
    }

    /// Process-wide instance, constructed on first use.
    ///
    /// Later calls return the existing instance regardless of the config
    /// passed; the service's lifetime is the process's.
    pub fn instance(config: &LicenseConfig) -> Result<Arc<LicenseService>> {
        if let Some(service) = INSTANCE.get() {
            return Ok(service.clone());
        }
        let service = Arc::new(Self::new(config)?);
        Ok(INSTANCE.get_or_init(|| service).clone())
    }
}

impl EntitlementGateway for LicenseService {
    async fn check_license(&self) -> Result<bool> {
        // No key configured means unlicensed; no network call.
        let Some(key) = self.license_key.as_deref() else {
            return Ok(false);
        };

        {
            let verdict = self.verdict.lock().await;
            if let Some(cached) = verdict.as_ref() {
                if cached.checked_at.elapsed() < self.cache_ttl {
                    debug!(valid = cached.valid, "returning cached license verdict");
                    return Ok(cached.valid);
                }
            }
        }

        let response = self
            .client
            .get(format!("{}/verify", self.api_url))
            .header("x-license-key", key)
            .send()
            .await
            .map_err(|e| SlotbookError::Entitlement(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SlotbookError::Entitlement(format!(
                "license api returned {}",
                response.status()
            )));
        }

        let body: LicenseResponse = response
            .json()
            .await
            .map_err(|e| SlotbookError::Entitlement(e.to_string()))?;

        *self.verdict.lock().await = Some(CachedVerdict {
            valid: body.valid,
            checked_at: Instant::now(),
        });

        Ok(body.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LicenseConfig {
        LicenseConfig {
            key: String::new(),
            api_url: "http://127.0.0.1:1/api/license".to_string(),
            cache_ttl_secs: 3600,
            timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_keyless_deployment_is_unlicensed() {
        let service = LicenseService::new(&test_config()).unwrap();
        assert!(!service.check_license().await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_hard_error() {
        let mut config = test_config();
        config.key = "lic_123".to_string();

        let service = LicenseService::new(&config).unwrap();
        let err = service.check_license().await.unwrap_err();
        assert!(matches!(err, SlotbookError::Entitlement(_)));
    }

    #[tokio::test]
    async fn test_cached_verdict_skips_network() {
        let mut config = test_config();
        config.key = "lic_123".to_string();

        let service = LicenseService::new(&config).unwrap();
        *service.verdict.lock().await = Some(CachedVerdict {
            valid: true,
            checked_at: Instant::now(),
        });

        // api_url is unreachable, so success proves the cache was used
        assert!(service.check_license().await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_verdict_is_refreshed() {
        let mut config = test_config();
        config.key = "lic_123".to_string();
        config.cache_ttl_secs = 0;

        let service = LicenseService::new(&config).unwrap();
        *service.verdict.lock().await = Some(CachedVerdict {
            valid: true,
            checked_at: Instant::now(),
        });

        // TTL of zero expires the cached verdict immediately, so the
        // unreachable api surfaces as an error.
        assert!(service.check_license().await.is_err());
    }
}
