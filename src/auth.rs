use std::collections::HashMap;
use std::num::ParseIntError;
use std::sync::{Arc, Mutex, PoisonError};

use actix_web::{http::header::HeaderValue, HttpRequest};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::schemas::{initials_of, UserId};

type HmacSha256 = Hmac<Sha256>;

pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
pub const EMAIL_ALREADY_IN_USE: &str = "auth/email-already-in-use";
pub const WEAK_PASSWORD: &str = "auth/weak-password";
pub const INVALID_EMAIL: &str = "auth/invalid-email";
pub const OPERATION_NOT_ALLOWED: &str = "auth/operation-not-allowed";
pub const USER_TOKEN_EXPIRED: &str = "auth/user-token-expired";

const MIN_PASSWORD_LENGTH: usize = 6;
/// Oldest Telegram login payload accepted, in seconds.
const LOGIN_WIDGET_MAX_AGE: i64 = 24 * 60 * 60;
/// Lifetime of a session token, in seconds.
const SESSION_TTL: i64 = 30 * 24 * 60 * 60;

/// A provider failure: a machine code plus the provider's own message.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{message} ({code})")]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl AuthError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// What to show the user. Unmapped codes fall back to the raw message.
    pub fn friendly_message(&self) -> String {
        match self.code.as_str() {
            INVALID_CREDENTIAL => "Invalid email or password. Please check your credentials and try again.".to_string(),
            EMAIL_ALREADY_IN_USE => {
                "This email address is already registered. Please sign in or use a different email.".to_string()
            }
            WEAK_PASSWORD => "The password is too weak. It must be at least 6 characters long.".to_string(),
            INVALID_EMAIL => "The email address is not valid. Please enter a valid email.".to_string(),
            _ => self.message.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: String,
    pub initials: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Session {
    pub token: String,
    pub user: AuthUser,
}

/// Payload of the Telegram login widget, used for federated sign-in.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TelegramAuthData {
    pub auth_date: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub id: String,
    pub photo_url: Option<String>,
    pub username: String,
    pub hash: String,
}

pub trait IdentityProvider: Send + Sync {
    fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    fn sign_in_with_federated_provider(&self, credential: &TelegramAuthData) -> Result<Session, AuthError>;

    fn sign_out(&self, token: &str);

    fn current_user(&self, token: &str) -> Option<AuthUser>;
}

struct Account {
    user: AuthUser,
    salt: String,
    digest: Vec<u8>,
}

/// Email/password accounts kept in memory, signed session tokens, and
/// Telegram login verification.
pub struct LocalIdentityProvider {
    secret: Vec<u8>,
    telegram_bot_token: Option<String>,
    accounts: Mutex<HashMap<String, Account>>,
    users: Mutex<HashMap<UserId, AuthUser>>,
    // token -> issued-at, kept until the token would have expired anyway
    revoked: Mutex<HashMap<String, i64>>,
}

impl LocalIdentityProvider {
    pub fn new(secret: &str, telegram_bot_token: Option<String>) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            telegram_bot_token,
            accounts: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            revoked: Mutex::new(HashMap::new()),
        }
    }

    fn issue_session(&self, user: AuthUser) -> Session {
        let payload = format!("{}.{}.{}", user.id, Utc::now().timestamp(), Uuid::new_v4().simple());
        let signature = to_hex(&sign(&self.secret, payload.as_bytes()));
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id.clone(), user.clone());
        Session {
            token: format!("{payload}.{signature}"),
            user,
        }
    }

    /// The user id and issue time of a correctly signed token.
    fn verify_token(&self, token: &str) -> Option<(UserId, i64)> {
        let (payload, signature) = token.rsplit_once('.')?;
        let signature = from_hex(signature).ok()?;
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;
        let (claims, _nonce) = payload.rsplit_once('.')?;
        let (user_id, issued_at) = claims.rsplit_once('.')?;
        Some((user_id.to_string(), issued_at.parse().ok()?))
    }
}

fn is_expired(issued_at: i64, now: i64) -> bool {
    now - issued_at > SESSION_TTL
}

impl IdentityProvider for LocalIdentityProvider {
    fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim().to_lowercase();
        if !looks_like_email(&email) {
            return Err(AuthError::new(INVALID_EMAIL, "Error (auth/invalid-email)."));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::new(
                WEAK_PASSWORD,
                "Password should be at least 6 characters (auth/weak-password).",
            ));
        }

        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(&email) {
            return Err(AuthError::new(EMAIL_ALREADY_IN_USE, "Error (auth/email-already-in-use)."));
        }
        let display_name = email.split('@').next().unwrap_or_default().to_string();
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.clone()),
            initials: initials_of(&display_name.replace(['.', '_', '-'], " ")),
            display_name,
        };
        let salt = Uuid::new_v4().simple().to_string();
        let digest = sign(salt.as_bytes(), password.as_bytes());
        accounts.insert(
            email,
            Account {
                user: user.clone(),
                salt,
                digest,
            },
        );
        drop(accounts);

        tracing::info!(user = %user.id, "account created");
        Ok(self.issue_session(user))
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim().to_lowercase();
        if !looks_like_email(&email) {
            return Err(AuthError::new(INVALID_EMAIL, "Error (auth/invalid-email)."));
        }
        let user = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let invalid = || AuthError::new(INVALID_CREDENTIAL, "Error (auth/invalid-credential).");
            let account = accounts.get(&email).ok_or_else(invalid)?;
            let mut mac = HmacSha256::new_from_slice(account.salt.as_bytes()).map_err(|_| invalid())?;
            mac.update(password.as_bytes());
            mac.verify_slice(&account.digest).map_err(|_| invalid())?;
            account.user.clone()
        };
        Ok(self.issue_session(user))
    }

    fn sign_in_with_federated_provider(&self, credential: &TelegramAuthData) -> Result<Session, AuthError> {
        let bot_token = self.telegram_bot_token.as_deref().ok_or_else(|| {
            AuthError::new(
                OPERATION_NOT_ALLOWED,
                "Federated sign-in is not enabled on this server.",
            )
        })?;
        let rejected = || AuthError::new(INVALID_CREDENTIAL, "The login widget signature does not match.");
        let hash = from_hex(&credential.hash).map_err(|_| rejected())?;
        if compute_hash(credential, bot_token) != hash {
            return Err(rejected());
        }
        let auth_date: i64 = credential.auth_date.trim().parse().map_err(|_| rejected())?;
        let age = Utc::now().timestamp() - auth_date;
        if !(-60..=LOGIN_WIDGET_MAX_AGE).contains(&age) {
            return Err(AuthError::new(
                USER_TOKEN_EXPIRED,
                "This Telegram login has expired. Please sign in again.",
            ));
        }

        let display_name = [credential.first_name.as_deref(), credential.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let display_name = if display_name.is_empty() {
            credential.username.clone()
        } else {
            display_name
        };
        let user = AuthUser {
            id: format!("telegram:{}", credential.id),
            email: None,
            initials: initials_of(&display_name),
            display_name,
        };
        Ok(self.issue_session(user))
    }

    fn sign_out(&self, token: &str) {
        let Some((_, issued_at)) = self.verify_token(token) else {
            return;
        };
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.lock().unwrap_or_else(PoisonError::into_inner);
        revoked.retain(|_, issued_at| !is_expired(*issued_at, now));
        if !is_expired(issued_at, now) {
            revoked.insert(token.to_string(), issued_at);
        }
    }

    fn current_user(&self, token: &str) -> Option<AuthUser> {
        let (user_id, issued_at) = self.verify_token(token)?;
        if is_expired(issued_at, Utc::now().timestamp()) {
            return None;
        }
        if self
            .revoked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(token)
        {
            return None;
        }
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(request: &HttpRequest) -> Option<&str> {
    request
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .map(HeaderValue::to_str)?
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.split('.').filter(|part| !part.is_empty()).count() >= 2
        }
        None => false,
    }
}

fn sign(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn from_hex(hex: &str) -> Result<Vec<u8>, ParseIntError> {
    hex.chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|n| u8::from_str_radix(&String::from_iter(n), 16))
        .collect()
}

/// Telegram's check: HMAC-SHA256 over the sorted `key=value` lines, keyed
/// by the SHA-256 of the bot token.
pub fn compute_hash(auth_data: &TelegramAuthData, bot_token: &str) -> Vec<u8> {
    let hash_content = [
        ("auth_date", Some(&auth_data.auth_date)),
        ("first_name", auth_data.first_name.as_ref()),
        ("id", Some(&auth_data.id)),
        ("last_name", auth_data.last_name.as_ref()),
        ("photo_url", auth_data.photo_url.as_ref()),
        ("username", Some(&auth_data.username)),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| format!("{key}={value}")))
    .collect::<Vec<_>>()
    .join("\n");

    let mut sha256_hasher = Sha256::new();
    sha256_hasher.update(bot_token.as_bytes());
    let bot_hash = sha256_hasher.finalize();
    sign(&bot_hash, hash_content.as_bytes())
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub loading: bool,
}

/// Client-side view of the signed-in user. Subscribers see `loading` until
/// the first restore or sign-in settles, then the user or `None`.
pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    token: Mutex<Option<String>>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(AuthState {
            user: None,
            loading: true,
        });
        Self {
            provider,
            token: Mutex::new(None),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Resumes a stored session, if it is still valid.
    pub fn restore(&self, token: Option<&str>) -> Option<AuthUser> {
        let user = token.and_then(|token| self.provider.current_user(token));
        let kept = user.as_ref().and(token).map(str::to_string);
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = kept;
        self.publish(user.clone());
        user
    }

    pub fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let session = self.settle(self.provider.sign_up(email, password))?;
        Ok(session.user)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let session = self.settle(self.provider.sign_in(email, password))?;
        Ok(session.user)
    }

    pub fn sign_in_with_federated_provider(&self, credential: &TelegramAuthData) -> Result<AuthUser, AuthError> {
        let session = self.settle(self.provider.sign_in_with_federated_provider(credential))?;
        Ok(session.user)
    }

    pub fn sign_out(&self) {
        if let Some(token) = self.token.lock().unwrap_or_else(PoisonError::into_inner).take() {
            self.provider.sign_out(&token);
        }
        self.publish(None);
    }

    // A failed attempt leaves whoever was signed in before.
    fn settle(&self, outcome: Result<Session, AuthError>) -> Result<Session, AuthError> {
        match outcome {
            Ok(session) => {
                *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.token.clone());
                self.publish(Some(session.user.clone()));
                Ok(session)
            }
            Err(err) => {
                let current = self.state.borrow().user.clone();
                self.publish(current);
                Err(err)
            }
        }
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.state.send_replace(AuthState { user, loading: false });
    }
}
