use crate::core::config::defaults;

/// How old (or how far in the future) a signed `auth_date` may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Maximum age in seconds; the boundary itself is still fresh.
    pub max_age_secs: i64,
    /// Tolerance for `auth_date` values ahead of the local clock.
    /// `None` accepts any future timestamp.
    pub max_clock_skew_secs: Option<i64>,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: defaults::AUTH_MAX_AGE_SECS,
            max_clock_skew_secs: None,
        }
    }
}

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Expired { age_secs: i64 },
    FromFuture { ahead_secs: i64 },
}

impl FreshnessPolicy {
    pub fn check(&self, auth_date: i64, now: i64) -> Freshness {
        let age_secs = now.saturating_sub(auth_date);

        if age_secs > self.max_age_secs {
            return Freshness::Expired { age_secs };
        }

        if let Some(skew) = self.max_clock_skew_secs {
            let ahead_secs = age_secs.saturating_neg();
            if ahead_secs > skew {
                return Freshness::FromFuture { ahead_secs };
            }
        }

        Freshness::Fresh
    }
}
