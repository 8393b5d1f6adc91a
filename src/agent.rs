// User-agent strings for outgoing requests. The endpoint is a public web
// form, so every request carries a plausible browser identity. The source is
// a trait so tests (and the `TINYSHRINK_USER_AGENT` override) can pin it.

use rand::seq::SliceRandom;
use rand::Rng;

pub trait UserAgentSource: Send + Sync {
    fn user_agent(&self) -> String;
}

/// Always returns the same string.
#[derive(Debug, Clone)]
pub struct FixedUserAgent(pub String);

impl UserAgentSource for FixedUserAgent {
    fn user_agent(&self) -> String {
        self.0.clone()
    }
}

const PLATFORMS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
];

/// Picks a platform and a browser family at random and fills in version
/// numbers, producing a new string on every call.
#[derive(Debug, Default, Clone)]
pub struct RandomUserAgent;

impl UserAgentSource for RandomUserAgent {
    fn user_agent(&self) -> String {
        let mut rng = rand::thread_rng();
        let platform = PLATFORMS.choose(&mut rng).copied().unwrap_or(PLATFORMS[0]);

        match rng.gen_range(0..3) {
            0 => {
                let major = rng.gen_range(110..=130);
                format!("Mozilla/5.0 ({platform}; rv:{major}.0) Gecko/20100101 Firefox/{major}.0")
            }
            1 => {
                let major = rng.gen_range(110..=130);
                let build = rng.gen_range(5000..=6800);
                let patch = rng.gen_range(0..=200);
                format!(
                    "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/{major}.0.{build}.{patch} Safari/537.36 Edg/{major}.0.{build}.{patch}"
                )
            }
            _ => {
                let major = rng.gen_range(110..=130);
                let build = rng.gen_range(5000..=6800);
                let patch = rng.gen_range(0..=200);
                format!(
                    "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/{major}.0.{build}.{patch} Safari/537.36"
                )
            }
        }
    }
}
