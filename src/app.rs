use axum::{
    Extension, Form, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use handlebars::{Handlebars, handlebars_helper};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::allowlist::{check_ip_whitelist, ip_block};
use crate::changelog::ChangeLog;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::editor::{display_view, edit_employee};
use crate::error::HrError;
use crate::login::{
    CurrentUser, SessionStore, UserTable, handle_login, handle_logout, require_auth,
    serve_login_page,
};
use crate::media::{MediaKind, MediaResolver};
use crate::query::{filter, group_by_team, sort_by_team};
use crate::store::RecordStore;

handlebars_helper!(urlencode: |s: str| urlencoding::encode(s).into_owned());

/// Everything the handlers share.
pub struct AppState {
    pub config: Config,
    pub store: RecordStore,
    pub changelog: ChangeLog,
    pub media: MediaResolver,
    pub sessions: SessionStore,
    pub users: UserTable,
    pub templates: Handlebars<'static>,
}

impl AppState {
    /// Build the state from configuration: create the private directories and
    /// the backing file, hash the account table and load the templates.
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        config.ensure_dirs()?;

        let store = RecordStore::new(config.db_path());
        store.ensure_exists()?;

        let mut templates = Handlebars::new();
        templates.set_dev_mode(config.debug);
        templates.register_helper("urlencode", Box::new(urlencode));
        templates.register_templates_directory(".hbs", &config.template_dir)?;

        Ok(AppState {
            changelog: ChangeLog::new(config.change_log_path()),
            media: MediaResolver::new(config.resume_dir(), config.photo_dir()),
            sessions: SessionStore::new(Duration::from_secs(config.session_minutes * 60)),
            users: UserTable::new(&config.users)?,
            store,
            templates,
            config,
        })
    }

    /// Render a template to an HTML response, or a 500 if rendering fails.
    pub fn render<T: Serialize>(&self, template: &str, context: &T) -> Response {
        match self.templates.render(template, context) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("Failed to render {}: {}", template, e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }

    fn error_page(&self, err: &HrError) -> Response {
        let status = match err {
            HrError::NotFound(_) => StatusCode::NOT_FOUND,
            HrError::StoreUnavailable(_) | HrError::StoreWriteFailed(_) => {
                error!("{}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let mut response = self.render(
            "error",
            &serde_json::json!({ "status": status.as_u16(), "message": err.user_message() }),
        );
        *response.status_mut() = status;
        response
    }
}

/// Build the router with all routes and middleware attached.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(serve_dashboard))
        .route("/employees", get(employee_list))
        .route(
            "/employees/:name",
            get(employee_detail).post(update_employee),
        )
        .route("/employees/:name/resume/view", get(resume_view))
        .route("/employees/:name/photo", get(photo_view))
        .route("/logout", get(handle_logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/login", get(serve_login_page).post(handle_login))
        .route("/ip_block", get(ip_block))
        .merge(protected)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            check_ip_whitelist,
        ))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config)?);

    let app = router(state.clone());

    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Listening on http://{} (db: {})",
        addr,
        state.store.path().display()
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Run blocking store work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, HrError>
where
    F: FnOnce() -> Result<T, HrError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(HrError::StoreUnavailable(format!("worker failed: {}", e))))
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Response {
    let worker = state.clone();
    let dashboard = blocking(move || Ok(Dashboard::collect(&worker.store, &worker.changelog))).await;
    match dashboard {
        Ok(dashboard) => state.render(
            "main",
            &serde_json::json!({
                "user": user,
                "employee_count": dashboard
                    .employee_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                "dashboard": dashboard,
            }),
        ),
        Err(e) => state.error_page(&e),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    q: String,
}

async fn employee_list(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<ListQuery>,
) -> Response {
    let worker = state.clone();
    let table = match blocking(move || worker.store.load()).await {
        Ok(table) => table,
        Err(e) => return state.error_page(&e),
    };

    let query = params.q.trim().to_lowercase();
    let team_order = &state.config.team_order;
    let mut records = filter(&table.rows, &query);
    sort_by_team(&mut records, team_order);
    let groups = group_by_team(&records, team_order);

    state.render(
        "employee_list",
        &serde_json::json!({
            "user": user,
            "query": query,
            "count": records.len(),
            "groups": groups,
        }),
    )
}

#[derive(Debug, Default, Deserialize)]
struct DetailQuery {
    saved: Option<String>,
}

async fn employee_detail(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
    Query(params): Query<DetailQuery>,
) -> Response {
    let worker = state.clone();
    let lookup = name.clone();
    let employee = blocking(move || {
        let table = worker.store.load()?;
        table
            .find(&lookup)
            .map(display_view)
            .ok_or_else(|| HrError::NotFound(format!("employee {:?}", lookup)))
    })
    .await;

    match employee {
        Ok(employee) => state.render(
            "employee_detail",
            &serde_json::json!({
                "user": user,
                "employee": employee,
                "saved": params.saved.is_some(),
            }),
        ),
        Err(e) => state.error_page(&e),
    }
}

async fn update_employee(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    let worker = state.clone();
    let target = name.clone();
    let result = blocking(move || {
        edit_employee(&worker.store, &worker.changelog, &target, &user, &form)
    })
    .await;

    match result {
        Ok(_) => Redirect::to(&format!(
            "/employees/{}?saved=1",
            urlencoding::encode(&name)
        ))
        .into_response(),
        Err(e) => state.error_page(&e),
    }
}

async fn resume_view(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    serve_media(state, MediaKind::Resume, name).await
}

async fn photo_view(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    serve_media(state, MediaKind::Photo, name).await
}

async fn serve_media(state: Arc<AppState>, kind: MediaKind, name: String) -> Response {
    let resolved = blocking(move || state.media.resolve(kind, &name)).await;
    let path = match resolved {
        Ok(path) => path,
        Err(e) => {
            info!("Media lookup failed: {}", e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();
            (
                [
                    (header::CONTENT_TYPE, kind.content_type().to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename*=UTF-8''{}", urlencoding::encode(&filename)),
                    ),
                ],
                Body::from(bytes),
            )
                .into_response()
        }
        Err(e) => {
            info!("Media read failed for {}: {}", path.display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
