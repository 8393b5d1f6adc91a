// Configuration: environment-driven client settings plus the small value
// types the CLI validates before a run starts.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::batch::Mode;
use crate::output::OutputNaming;

pub const DEFAULT_ENDPOINT: &str = "https://tinypng.com/web/shrink";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RATIO: f64 = 50.0;

/// Settings for the HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub show_progress: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            show_progress: false,
        }
    }
}

impl ClientSettings {
    /// Read `TINYSHRINK_ENDPOINT`, `TINYSHRINK_TIMEOUT_SECS` and
    /// `TINYSHRINK_USER_AGENT`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("TINYSHRINK_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.into());

        let timeout_secs = match lookup("TINYSHRINK_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(value = %raw, "Invalid TINYSHRINK_TIMEOUT_SECS, using {}", DEFAULT_TIMEOUT_SECS);
                    DEFAULT_TIMEOUT_SECS
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let user_agent = lookup("TINYSHRINK_USER_AGENT").filter(|v| !v.trim().is_empty());

        ClientSettings {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            user_agent,
            show_progress: false,
        }
    }
}

/// Ceiling on the cumulative shrink in recursive mode, as a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxRatio(f64);

impl MaxRatio {
    /// Values outside `[0, 100]` (and NaN) reset to the default rather than
    /// being clamped to the nearest bound.
    pub fn new(value: f64) -> Self {
        if (0.0..=100.0).contains(&value) {
            MaxRatio(value)
        } else {
            MaxRatio(DEFAULT_MAX_RATIO)
        }
    }

    pub fn is_valid(value: f64) -> bool {
        (0.0..=100.0).contains(&value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for MaxRatio {
    fn default() -> Self {
        MaxRatio(DEFAULT_MAX_RATIO)
    }
}

/// How rejected uploads (rate limiting) are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(3),
            backoff: 1.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: f64) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff: if backoff.is_finite() && backoff >= 1.0 { backoff } else { 1.0 },
            ..Default::default()
        }
    }

    /// Delay to wait after the `attempt`-th rejection (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Everything a batch run needs besides the client itself.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub naming: OutputNaming,
    pub output_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_max_ratio_out_of_range_resets_to_default() {
        assert_eq!(MaxRatio::new(-5.0).value(), DEFAULT_MAX_RATIO);
        assert_eq!(MaxRatio::new(150.0).value(), DEFAULT_MAX_RATIO);
        assert_eq!(MaxRatio::new(f64::NAN).value(), DEFAULT_MAX_RATIO);
    }

    #[test]
    fn test_max_ratio_keeps_in_range_values() {
        assert_eq!(MaxRatio::new(0.0).value(), 0.0);
        assert_eq!(MaxRatio::new(72.5).value(), 72.5);
        assert_eq!(MaxRatio::new(100.0).value(), 100.0);
        assert_eq!(MaxRatio::default().value(), 50.0);
    }

    #[test]
    fn test_retry_policy_fixed_delay_by_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for(7), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_policy_backoff_is_capped() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2), 2.0);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(20), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_policy_never_zero_attempts() {
        let policy = RetryPolicy::new(0, Duration::ZERO, 0.5);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, 1.0);
    }

    #[test]
    fn test_client_settings_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TINYSHRINK_ENDPOINT", "http://localhost:9999/shrink"),
            ("TINYSHRINK_TIMEOUT_SECS", "5"),
            ("TINYSHRINK_USER_AGENT", "agent/1"),
        ]);
        let settings = ClientSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(settings.endpoint, "http://localhost:9999/shrink");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.user_agent.as_deref(), Some("agent/1"));
    }

    #[test]
    fn test_client_settings_defaults_on_bad_values() {
        let settings = ClientSettings::from_lookup(|k| match k {
            "TINYSHRINK_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(settings, ClientSettings::default());
    }
}
