//! Safe-redirect resolution.
//!
//! Callback destinations arrive as attacker-controlled query parameters.
//! Only destinations on the application's own origin (or an explicitly
//! configured trusted origin) are honored; everything else, including
//! anything that fails to parse, resolves to `None`.

use tracing::warn;
use url::Url;

/// Validates caller-supplied redirect destinations.
pub struct RedirectResolver {
    base: Url,
    trusted: Vec<Url>,
}

impl RedirectResolver {
    /// Create a resolver for the given site.
    ///
    /// Invalid entries in `trusted_origins` are skipped with a warning
    /// rather than failing startup.
    pub fn new(website_url: &str, trusted_origins: &[String]) -> crate::Result<Self> {
        let base = Url::parse(website_url).map_err(|e| {
            crate::SlotbookError::Config(format!("invalid website url {website_url:?}: {e}"))
        })?;

        let trusted = trusted_origins
            .iter()
            .filter_map(|origin| match Url::parse(origin) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "skipping invalid trusted origin");
                    None
                }
            })
            .collect();

        Ok(Self { base, trusted })
    }

    /// Resolve a candidate destination, returning it verbatim if safe.
    ///
    /// Relative paths are checked against the site origin; absolute URLs
    /// must match the site origin or one of the trusted origins. Never
    /// panics on malformed input.
    pub fn resolve(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }

        let resolved = Url::options()
            .base_url(Some(&self.base))
            .parse(candidate)
            .ok()?;

        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }

        let origin = resolved.origin();
        if origin == self.base.origin() || self.trusted.iter().any(|t| t.origin() == origin) {
            Some(candidate.to_string())
        } else {
            None
        }
    }
}
