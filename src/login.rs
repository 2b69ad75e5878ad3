#![cfg(not(tarpaulin_include))]

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::app::AppState;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session";

/// Login form data
#[derive(Debug, Deserialize)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
    /// Page to return to after a successful login.
    #[serde(default)]
    pub next: String,
}

/// Query string of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub logout: Option<String>,
}

/// The fixed table of accounts allowed to log in.
///
/// Passwords are hashed with Argon2 when the table is built so plaintext does
/// not stay in memory.
pub struct UserTable {
    users: HashMap<String, String>,
}

impl UserTable {
    pub fn new(accounts: &[(String, String)]) -> Result<Self, String> {
        let mut users = HashMap::new();
        for (username, password) in accounts {
            users.insert(username.clone(), hash_password(password)?);
        }
        Ok(UserTable { users })
    }

    /// Check credentials.
    pub fn verify(&self, username: &str, password: &str) -> LoginOutcome {
        match self.users.get(username) {
            None => LoginOutcome::UnknownUser,
            Some(hash) => match verify_password(password, hash) {
                Ok(true) => LoginOutcome::Ok,
                Ok(false) => LoginOutcome::WrongPassword,
                Err(e) => {
                    warn!("Stored hash for {} is unusable: {}", username, e);
                    LoginOutcome::WrongPassword
                }
            },
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Ok,
    UnknownUser,
    WrongPassword,
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err("Password hashing failed".to_string()),
    }
}

/// Verify a password against a stored hash
fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// User session data
#[derive(Debug, Clone)]
pub struct Session {
    /// Username of the authenticated user
    pub user_id: String,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// Server-side session storage keyed by the session cookie value.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    /// Create a new user session and return its id.
    pub fn create(&self, username: &str) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            user_id: username.to_string(),
            expires_at: SystemTime::now() + self.lifetime,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        // Drop expired sessions while we hold the write lock anyway.
        let now = SystemTime::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session_id.clone(), session);

        session_id
    }

    /// Username for a live session, `None` if unknown or expired.
    pub fn validate(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);

        sessions
            .get(session_id)
            .filter(|session| session.expires_at > SystemTime::now())
            .map(|session| session.user_id.clone())
    }

    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id);
    }
}

/// The authenticated username, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// Only follow `next` to pages on this site.
fn safe_next(next: &str) -> Option<&str> {
    (next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')).then_some(next)
}

fn session_user(state: &AppState, jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.validate(cookie.value()))
        .filter(|user| state.users.contains(user))
}

/// Serve the login page HTML
pub async fn serve_login_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Response {
    if session_user(&state, &jar).is_some() {
        return Redirect::to("/").into_response();
    }

    let message = match query.error.as_str() {
        "unknown_user" => Some(("danger", "존재하지 않는 사용자명입니다.")),
        "wrong_password" => Some(("danger", "비밀번호가 올바르지 않습니다.")),
        _ if query.logout.is_some() => Some(("success", "로그아웃되었습니다.")),
        _ if !query.next.is_empty() => Some(("warning", "로그인이 필요합니다.")),
        _ => None,
    };
    let context = serde_json::json!({
        "next": query.next,
        "message": message.map(|(kind, text)| serde_json::json!({ "kind": kind, "text": text })),
    });
    state.render("login", &context)
}

/// Handle user login requests
///
/// Processes login form submissions, validates credentials, and creates a session if valid.
#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    let username = credentials.username.trim();
    let next_param = if credentials.next.is_empty() {
        String::new()
    } else {
        format!("&next={}", urlencoding::encode(&credentials.next))
    };

    match state.users.verify(username, &credentials.password) {
        LoginOutcome::Ok => {
            info!("{} logged in", username);
            let session_id = state.sessions.create(username);
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.config.session_cookie_secure);
            let target = safe_next(&credentials.next).unwrap_or("/").to_string();
            (jar.add(cookie), Redirect::to(&target)).into_response()
        }
        LoginOutcome::UnknownUser => {
            warn!("Login attempt for unknown user {:?}", username);
            Redirect::to(&format!("/login?error=unknown_user{}", next_param)).into_response()
        }
        LoginOutcome::WrongPassword => {
            warn!("Wrong password for {}", username);
            Redirect::to(&format!("/login?error=wrong_password{}", next_param)).into_response()
        }
    }
}

/// Handle user logout
///
/// Forgets the server-side session, clears the cookie and redirects to the login page.
pub async fn handle_logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login?logout=1")).into_response()
}

/// Authentication middleware
///
/// Lets requests with a live session through with a [`CurrentUser`] extension;
/// everything else is redirected to the login page with `next` set to the
/// requested page.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if let Some(username) = session_user(&state, &jar) {
        request.extensions_mut().insert(CurrentUser(username));
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    Redirect::to(&format!("/login?next={}", urlencoding::encode(&target))).into_response()
}
