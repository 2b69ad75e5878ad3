#![cfg(feature = "web")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use insa_db::app::{AppState, router};
use insa_db::config::Config;
use insa_db::employee::{Employee, Table};
use insa_db::store::RecordStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    _dir: TempDir,
    state: Arc<AppState>,
}

fn test_config(dir: &TempDir) -> Config {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    Config {
        private_dir: dir.path().join("private"),
        template_dir: manifest.join("templates"),
        static_dir: manifest.join("static"),
        users: vec![("admin".to_string(), "1234".to_string())],
        ..Config::default()
    }
}

fn seed(config: &Config) {
    let store = RecordStore::new(config.db_path());
    let mut table = Table::with_base_columns();
    table.backfill_columns();
    for (name, team, position) in [
        ("김철수", "센터", "센터장"),
        ("홍길동", "테스트팀", "매니저"),
        ("이영희", "", "인턴"),
    ] {
        let mut emp = Employee::new(name);
        emp.team_name = team.to_string();
        emp.position = position.to_string();
        table.rows.push(emp);
    }
    store.save(&table).unwrap();
}

fn seeded_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config);
    TestApp {
        state: Arc::new(AppState::new(config).unwrap()),
        _dir: dir,
    }
}

impl TestApp {
    fn router(&self) -> Router {
        router(self.state.clone())
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Log in and return the `name=value` cookie pair.
    async fn login(&self) -> String {
        let response = self
            .post_form("/login", "username=admin&password=1234", None)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login sets a cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has a location")
        .to_str()
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn unauthenticated_requests_go_to_login() {
    let app = seeded_app();

    let response = app.get("/employees?q=center", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Femployees%3Fq%3Dcenter");

    let response = app.get("/login?next=%2Femployees", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("로그인이 필요합니다"));
}

#[tokio::test]
async fn login_failures_redirect_with_reason() {
    let app = seeded_app();

    let response = app
        .post_form("/login", "username=nobody&password=x&next=%2Femployees", None)
        .await;
    assert_eq!(
        location(&response),
        "/login?error=unknown_user&next=%2Femployees"
    );
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = app
        .post_form("/login", "username=admin&password=wrong", None)
        .await;
    assert_eq!(location(&response), "/login?error=wrong_password");
}

#[tokio::test]
async fn login_honours_local_next_only() {
    let app = seeded_app();

    let response = app
        .post_form("/login", "username=admin&password=1234&next=%2Femployees", None)
        .await;
    assert_eq!(location(&response), "/employees");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let response = app
        .post_form(
            "/login",
            "username=admin&password=1234&next=https%3A%2F%2Fevil.example",
            None,
        )
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn employee_list_is_grouped_by_team_priority() {
    let app = seeded_app();
    let cookie = app.login().await;

    let response = app.get("/employees", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let hong = html.find("홍길동").unwrap();
    let kim = html.find("김철수").unwrap();
    let lee = html.find("이영희").unwrap();
    assert!(hong < kim && kim < lee);
    assert!(html.contains("소속 없음"));
    assert!(html.contains("3명"));

    let response = app.get("/employees?q=%EC%84%BC%ED%84%B0", Some(&cookie)).await;
    let html = body_text(response).await;
    assert!(html.contains("김철수"));
    assert!(!html.contains("홍길동"));
    assert!(html.contains("1명"));
}

#[tokio::test]
async fn edit_round_trip_through_the_detail_page() {
    let app = seeded_app();
    let cookie = app.login().await;
    let path = "/employees/%ED%99%8D%EA%B8%B8%EB%8F%99";

    let response = app
        .post_form(path, "mbti=INTJ&hire_date=2025.8.11&salary=3000", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("{path}?saved=1"));

    let response = app.get(&format!("{path}?saved=1"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("INTJ"));
    assert!(html.contains("2025-08-11"));
    assert!(html.contains("30000000"));

    let entries = app.state.changelog.recent_entries(10);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user, "admin");
    assert_eq!(entries[0].employee, "홍길동");

    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("by admin"));
    assert!(html.contains("hire_date"));
}

#[tokio::test]
async fn unknown_employee_is_404() {
    let app = seeded_app();
    let cookie = app.login().await;

    let response = app.get("/employees/nobody", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post_form("/employees/nobody", "mbti=INTJ", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn media_is_served_inline_or_404() {
    let app = seeded_app();
    let cookie = app.login().await;
    let config = &app.state.config;
    std::fs::write(config.photo_dir().join("default.png"), b"fake png").unwrap();
    std::fs::write(config.resume_dir().join("홍길동.pdf"), b"%PDF-1.4").unwrap();

    let response = app
        .get("/employees/%ED%99%8D%EA%B8%B8%EB%8F%99/resume/view", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("inline")
    );
    assert_eq!(body_text(response).await, "%PDF-1.4");

    let response = app.get("/employees/nobody/resume/view", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/employees/nobody/photo", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let response = app
        .get("/employees/..%2Fresume%2F%ED%99%8D%EA%B8%B8%EB%8F%99/photo", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = seeded_app();
    let cookie = app.login().await;

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(location(&response), "/login?logout=1");

    let response = app.get("/employees", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn ip_allow_list_blocks_unlisted_peers() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.ip_whitelist.insert("10.0.0.5".to_string());
    let app = TestApp {
        state: Arc::new(AppState::new(config).unwrap()),
        _dir: dir,
    };

    let blocked = app
        .router()
        .layer(MockConnectInfo(SocketAddr::from(([192, 168, 0, 9], 4000))));
    let response = blocked
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/ip_block");

    let response = blocked
        .oneshot(Request::builder().uri("/ip_block").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .router()
        .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 5], 4000))));
    let response = allowed
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    // Through the allow-list, on to the login check.
    assert_eq!(location(&response), "/login?next=%2F");
}

#[tokio::test]
async fn first_run_creates_the_private_layout() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let (db, resume, photo) = (config.db_path(), config.resume_dir(), config.photo_dir());
    assert!(!db.exists());

    let app = TestApp {
        state: Arc::new(AppState::new(config).unwrap()),
        _dir: dir,
    };
    assert!(db.exists());
    assert!(resume.is_dir() && photo.is_dir());
    assert_eq!(app.state.store.load().unwrap().len(), 0);

    let cookie = app.login().await;
    let response = app.get("/employees", Some(&cookie)).await;
    assert!(body_text(response).await.contains("검색 결과가 없습니다"));
}
