use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::gateway::TokenIssuer;
use crate::providers::ProviderError;

/// Tokens closer than this to expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Process-wide single-slot bearer token cache.
///
/// The lock is held across check, exchange, and store, so concurrent callers
/// with a cold cache wait for one exchange instead of racing their own.
pub struct TokenCache {
    issuer: Arc<dyn TokenIssuer>,
    slot: Mutex<Option<AuthToken>>,
    margin: Duration,
}

impl TokenCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            issuer,
            slot: Mutex::new(None),
            margin: Duration::seconds(REFRESH_MARGIN_SECS),
        }
    }

    pub async fn get_token(&self) -> Result<String, ProviderError> {
        self.get_token_at(Utc::now()).await
    }

    pub async fn get_token_at(&self, now: DateTime<Utc>) -> Result<String, ProviderError> {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref() {
            if token.is_fresh_at(now, self.margin) {
                debug!("reusing cached taxonomy token");
                return Ok(token.value.clone());
            }
        }

        let issued = self.issuer.exchange().await?;
        if issued.access_token.trim().is_empty() {
            return Err(ProviderError::Decode(
                "token response carried an empty access_token".to_string(),
            ));
        }

        let expires_at = Duration::try_seconds(issued.expires_in.max(0))
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                ProviderError::Decode(format!(
                    "token lifetime of {}s is out of range",
                    issued.expires_in
                ))
            })?;

        let token = AuthToken {
            value: issued.access_token,
            expires_at,
        };
        info!(expires_at = %token.expires_at, "refreshed taxonomy access token");
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drops the cached token, e.g. after the provider rejected it.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    pub async fn cached(&self) -> Option<AuthToken> {
        self.slot.lock().await.clone()
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::market::gateway::IssuedToken;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingIssuer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn exchange(&self) -> Result<IssuedToken, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(ProviderError::Status(401));
            }
            Ok(IssuedToken {
                access_token: format!("token-{call}"),
                expires_in: 3600,
            })
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 24, 10, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[tokio::test]
    async fn reuses_token_inside_expiry_margin() {
        let issuer = Arc::new(CountingIssuer::default());
        let cache = TokenCache::new(issuer.clone());

        let first = cache.get_token_at(start()).await.expect("token issued");
        let second = cache
            .get_token_at(start() + Duration::seconds(30))
            .await
            .expect("token cached");

        assert_eq!(first, second);
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refreshes_when_within_margin_of_expiry() {
        let issuer = Arc::new(CountingIssuer::default());
        let cache = TokenCache::new(issuer.clone());

        cache.get_token_at(start()).await.expect("token issued");
        let refreshed = cache
            .get_token_at(start() + Duration::seconds(3600 - 30))
            .await
            .expect("token refreshed");

        assert_eq!(refreshed, "token-2");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
        let cached = cache.cached().await.expect("slot populated");
        assert_eq!(
            cached.expires_at,
            start() + Duration::seconds(3600 - 30) + Duration::seconds(3600)
        );
    }

    #[tokio::test]
    async fn invalidate_forces_new_exchange() {
        let issuer = Arc::new(CountingIssuer::default());
        let cache = TokenCache::new(issuer.clone());

        cache.get_token_at(start()).await.expect("token issued");
        cache.invalidate().await;
        let next = cache.get_token_at(start()).await.expect("token reissued");

        assert_eq!(next, "token-2");
    }

    #[tokio::test]
    async fn exchange_failure_leaves_slot_empty() {
        let issuer = Arc::new(CountingIssuer {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = TokenCache::new(issuer);

        let error = cache.get_token_at(start()).await.expect_err("exchange fails");
        assert_eq!(error, ProviderError::Status(401));
        assert!(cache.cached().await.is_none());
    }

    struct EndlessIssuer;

    #[async_trait]
    impl TokenIssuer for EndlessIssuer {
        async fn exchange(&self) -> Result<IssuedToken, ProviderError> {
            Ok(IssuedToken {
                access_token: "forever".to_string(),
                expires_in: i64::MAX,
            })
        }
    }

    #[tokio::test]
    async fn unrepresentable_lifetime_is_a_decode_error() {
        let cache = TokenCache::new(Arc::new(EndlessIssuer));

        let error = cache.get_token_at(start()).await.expect_err("lifetime rejected");

        assert!(matches!(error, ProviderError::Decode(_)));
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_cold_callers_share_one_exchange() {
        let issuer = Arc::new(CountingIssuer::default());
        let cache = Arc::new(TokenCache::new(issuer.clone()));

        let (a, b) = tokio::join!(cache.get_token_at(start()), cache.get_token_at(start()));

        assert_eq!(a.expect("first caller"), b.expect("second caller"));
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }
}
