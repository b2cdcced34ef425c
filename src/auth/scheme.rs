use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

use super::canonical::data_check_string;
use super::payload::AuthPayload;

type HmacSha256 = Hmac<Sha256>;

/// Literal key used to derive the Mini App secret from the bot token
const WEB_APP_KEY_SALT: &[u8] = b"WebAppData";

/// Signature scheme, chosen by the endpoint that received the payload.
///
/// The two schemes use different keys derived from the same bot token, so a
/// payload signed for one is never accepted by the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    /// Telegram Login Widget: key = SHA256(bot_token)
    LoginWidget,
    /// Telegram Mini App `initData`: key = HMAC_SHA256("WebAppData", bot_token)
    WebApp,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::LoginWidget => "login_widget",
            AuthScheme::WebApp => "web_app",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret keys for both schemes, derived once from the bot token.
pub struct AuthKeys {
    login_widget: [u8; 32],
    web_app: [u8; 32],
}

impl AuthKeys {
    pub fn derive(bot_token: &SecretString) -> Self {
        let token = bot_token.expose_secret().as_bytes();

        let mut login_widget = [0u8; 32];
        login_widget.copy_from_slice(&Sha256::digest(token));

        let mut mac = new_mac(WEB_APP_KEY_SALT);
        mac.update(token);
        let mut web_app = [0u8; 32];
        web_app.copy_from_slice(&mac.finalize().into_bytes());

        Self { login_widget, web_app }
    }

    fn key(&self, scheme: AuthScheme) -> &[u8] {
        match scheme {
            AuthScheme::LoginWidget => &self.login_widget,
            AuthScheme::WebApp => &self.web_app,
        }
    }

    fn mac_for(&self, scheme: AuthScheme, payload: &AuthPayload) -> HmacSha256 {
        let mut mac = new_mac(self.key(scheme));
        mac.update(data_check_string(payload).as_bytes());
        mac
    }

    /// Expected signature of `payload` under `scheme`, lowercase hex.
    ///
    /// A `hash` field present in the payload is ignored.
    pub fn sign(&self, scheme: AuthScheme, payload: &AuthPayload) -> String {
        hex::encode(self.mac_for(scheme, payload).finalize().into_bytes())
    }

    /// Checks `received_hash` against the signature of `payload`.
    ///
    /// The hex string is decoded first and compared with `verify_slice`, which
    /// runs in constant time and rejects digests of the wrong length outright.
    pub fn verify(&self, scheme: AuthScheme, payload: &AuthPayload, received_hash: &str) -> bool {
        let Ok(received) = hex::decode(received_hash) else {
            return false;
        };
        self.mac_for(scheme, payload).verify_slice(&received).is_ok()
    }
}

impl fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKeys").finish_non_exhaustive()
    }
}

#[allow(clippy::expect_used)]
fn new_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}
