use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use log::warn;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::app::AppState;

/// Paths reachable from any address, so a blocked client can still see why.
const EXEMPT_PREFIXES: [&str; 3] = ["/static", "/ip_block", "/login"];

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// IP allow-list middleware.
///
/// With an empty allow-list every address is let through. Otherwise requests
/// from unlisted peers to non-exempt paths are redirected to `/ip_block`.
pub async fn check_ip_whitelist(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let whitelist = &state.config.ip_whitelist;
    if whitelist.is_empty() || is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let client_ip = peer
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    if whitelist.contains(&client_ip) {
        return next.run(request).await;
    }

    warn!(
        "Blocked IP {} accessing {}",
        if client_ip.is_empty() { "<unknown>" } else { &client_ip },
        request.uri().path()
    );
    Redirect::to("/ip_block").into_response()
}

/// Page shown to blocked clients.
pub async fn ip_block(State(state): State<Arc<AppState>>) -> Response {
    let mut response = state.render("ip_block", &serde_json::json!({}));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response
}

#[cfg(test)]
mod tests {
    use super::is_exempt;

    #[test]
    fn exempt_paths() {
        assert!(is_exempt("/login"));
        assert!(is_exempt("/static/style.css"));
        assert!(is_exempt("/ip_block"));
        assert!(!is_exempt("/loginx"));
        assert!(!is_exempt("/employees"));
        assert!(!is_exempt("/"));
    }
}
