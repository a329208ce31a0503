//! Session cookies installed into every fresh browser session

use rand::Rng;

const SESSION_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SESSION_ID_LEN: usize = 24;

pub const COOKIE_DOMAIN: &str = ".naver.com";
pub const COOKIE_PATH: &str = "/";
pub const SESSION_COOKIE_NAME: &str = "nstore_session";
pub const EXPERIMENT_COOKIE_NAME: &str = "OEP_CONFIG";
/// Lifetime of the experiment-config cookie in seconds
pub const EXPERIMENT_COOKIE_TTL_SECS: i64 = 300;

const EXPERIMENT_COOKIE_VALUE: &str = "%5B%7B%22serId%22%3A%22shopping%22%2C%22type%22%3A%22oep%22%2C%22expId%22%3A%22TEST-20251223-2%22%2C%22varId%22%3A%2219%22%2C%22value%22%3A%7B%22stms%22%3A%5B%22100411802%22%5D%7D%2C%22userType%22%3A%22nnb%22%2C%22provId%22%3A%22%22%2C%22sesnId%22%3A%22%22%7D%5D";

/// A cookie to install before navigating
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub name: &'static str,
    pub value: String,
    pub domain: &'static str,
    pub path: &'static str,
    /// Expiry in seconds since the Unix epoch; `None` is a session cookie
    pub expires: Option<i64>,
}

/// Random alphanumeric session id
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_CHARSET[rng.random_range(0..SESSION_ID_CHARSET.len())] as char)
        .collect()
}

/// The cookie set for a fresh session, expiring relative to `now_unix`
pub fn fresh_session_cookies(now_unix: i64) -> [SessionCookie; 2] {
    [
        SessionCookie {
            name: SESSION_COOKIE_NAME,
            value: generate_session_id(),
            domain: COOKIE_DOMAIN,
            path: COOKIE_PATH,
            expires: None,
        },
        SessionCookie {
            name: EXPERIMENT_COOKIE_NAME,
            value: EXPERIMENT_COOKIE_VALUE.to_string(),
            domain: COOKIE_DOMAIN,
            path: COOKIE_PATH,
            expires: Some(now_unix + EXPERIMENT_COOKIE_TTL_SECS),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_24_alphanumeric_chars() {
        let id = generate_session_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn experiment_cookie_expires_after_ttl() {
        let [session, experiment] = fresh_session_cookies(1_000);
        assert_eq!(session.name, SESSION_COOKIE_NAME);
        assert_eq!(session.expires, None);
        assert_eq!(experiment.expires, Some(1_300));
        assert_eq!(experiment.domain, ".naver.com");
    }
}
