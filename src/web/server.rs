//! Axum server for the quiz pages.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::Result;
use crate::health::QuizMetrics;
use crate::orchestrator::Orchestrator;
use crate::quiz::Validator;

use super::routes;
use super::session::SessionCodec;

/// Shared state for all handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub sessions: SessionCodec,
    pub validator: Validator,
    pub metrics: Arc<QuizMetrics>,
    /// Questions per quiz.
    pub quiz_length: u32,
    /// Cache low-water mark, reported by `/health`.
    pub low_water: usize,
    pub started: Instant,
}

impl AppState {
    pub fn new(
        config: &Config,
        orchestrator: Orchestrator,
        sessions: SessionCodec,
        metrics: Arc<QuizMetrics>,
    ) -> Self {
        Self {
            orchestrator,
            sessions,
            validator: Validator::new(config.validation),
            metrics,
            quiz_length: config.server.quiz_length,
            low_water: config.cache.min,
            started: Instant::now(),
        }
    }
}

/// Build the router with all quiz routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/quiz", get(routes::quiz_get).post(routes::quiz_post))
        .route("/resultado", get(routes::result))
        .route("/error", get(routes::error_page))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve until `shutdown_rx` flips to `true`.
pub async fn start_server(
    config: &Config,
    state: AppState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = build_router(state);
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Quiz server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QuestionCache;
    use crate::providers::scripted::ScriptedProvider;
    use crate::quiz::{Generator, QuestionRecord};
    use crate::web::session::{MissedLog, MissedQuestion, QuizSession, MISSED_COOKIE, SESSION_COOKIE};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    const SECRET: &str = "test-secret";

    fn test_config() -> Config {
        let mut config = Config::default();
        config.retrieval.take_timeout_secs = 0;
        config.retrieval.retry_delay_secs = 0;
        config.retrieval.max_attempts = 3;
        config.server.quiz_length = 2;
        config
    }

    fn make_app(provider: Arc<ScriptedProvider>) -> Router {
        let config = test_config();
        let metrics = Arc::new(QuizMetrics::new());
        let orchestrator = Orchestrator::new(
            Arc::new(QuestionCache::new(config.cache.size)),
            Generator::new(provider, "prompt"),
            &config.retrieval,
            metrics.clone(),
        );
        let state = AppState::new(
            &config,
            orchestrator,
            SessionCodec::new(SECRET, config.server.session_max_age_secs),
            metrics,
        );
        build_router(state)
    }

    fn session_cookie(session: &QuizSession) -> String {
        let token = SessionCodec::new(SECRET, 3600).encode(session).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    fn question() -> QuestionRecord {
        QuestionRecord {
            prompt_text: "What prints?".into(),
            code_block: "print(3)".into(),
            answer_options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            correct_answer: "3".into(),
            explanation: "Prints three.".into(),
        }
    }

    fn missed_cookie(log: &MissedLog) -> String {
        let token = SessionCodec::new(SECRET, 3600).encode(log).unwrap();
        format!("{MISSED_COOKIE}={token}")
    }

    fn set_cookie(resp: &axum::response::Response, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        resp.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(str::to_string)
    }

    fn token(set_cookie: &str) -> &str {
        set_cookie
            .split_once('=')
            .map(|(_, rest)| rest)
            .unwrap_or_default()
            .split(';')
            .next()
            .unwrap_or_default()
    }

    fn location(resp: &axum::response::Response) -> &str {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn answer(cookie: &str, selection: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/quiz")
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("respuesta={selection}")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_clears_session_cookie() {
        let app = make_app(Arc::new(ScriptedProvider::valid()));
        let req = Request::builder()
            .uri("/")
            .header(header::COOKIE, session_cookie(&QuizSession::start(question())))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = set_cookie(&resp, SESSION_COOKIE).expect("removal cookie");
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_quiz_get_starts_session_and_renders_question() {
        let provider = Arc::new(ScriptedProvider::valid());
        let app = make_app(provider.clone());
        let req = Request::builder().uri("/quiz").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(set_cookie(&resp, SESSION_COOKIE).unwrap().contains("HttpOnly"));
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Pregunta 1 de 2"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_quiz_get_reuses_current_question() {
        let provider = Arc::new(ScriptedProvider::valid());
        let app = make_app(provider.clone());
        let cookie = session_cookie(&QuizSession::start(question()));
        let req = Request::builder()
            .uri("/quiz")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("print(3)"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_quiz_get_redirects_to_error_when_budget_exhausted() {
        let provider = Arc::new(ScriptedProvider::always(Ok("no json here".into())));
        let app = make_app(provider.clone());
        let req = Request::builder().uri("/quiz").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(location(&resp).starts_with("/error?detalle="));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_answer_without_session_redirects_home() {
        let app = make_app(Arc::new(ScriptedProvider::valid()));
        let req = Request::builder()
            .method("POST")
            .uri("/quiz")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("respuesta=1"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn test_answer_advances_to_next_question() {
        let provider = Arc::new(ScriptedProvider::valid());
        let app = make_app(provider.clone());
        let resp = app
            .oneshot(answer(&session_cookie(&QuizSession::start(question())), "3"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/quiz");
        assert_eq!(provider.calls(), 1);

        let cookie = set_cookie(&resp, SESSION_COOKIE).unwrap();
        let session: QuizSession = SessionCodec::new(SECRET, 3600)
            .decode(token(&cookie))
            .unwrap();
        assert_eq!(session.score, 1);
        assert_eq!(session.total, 1);
        assert_eq!(session.current.unwrap().prompt_text, "Q");
        assert!(set_cookie(&resp, MISSED_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_wrong_answer_extends_missed_log() {
        let app = make_app(Arc::new(ScriptedProvider::valid()));
        let resp = app
            .oneshot(answer(&session_cookie(&QuizSession::start(question())), "2"))
            .await
            .unwrap();
        assert_eq!(location(&resp), "/quiz");
        let cookie = set_cookie(&resp, MISSED_COOKIE).unwrap();
        let log: MissedLog = SessionCodec::new(SECRET, 3600)
            .decode(token(&cookie))
            .unwrap();
        assert_eq!(log.entries.len(), 1);
        assert_eq!(log.entries[0].selected, "2");
        assert_eq!(log.entries[0].explanation, "Prints three.");
    }

    #[tokio::test]
    async fn test_last_answer_redirects_to_result() {
        let provider = Arc::new(ScriptedProvider::valid());
        let app = make_app(provider.clone());
        let mut session = QuizSession::start(question());
        session.total = 1;
        session.score = 1;
        let resp = app
            .oneshot(answer(&session_cookie(&session), "1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(location(&resp).starts_with("/resultado?correctas=1&tiempo="));
        assert_eq!(provider.calls(), 0);
        let cleared = set_cookie(&resp, SESSION_COOKIE).expect("session removal");
        assert!(cleared.contains("Max-Age=0"));
        let log: MissedLog = SessionCodec::new(SECRET, 3600)
            .decode(token(&set_cookie(&resp, MISSED_COOKIE).unwrap()))
            .unwrap();
        assert_eq!(log.entries[0].prompt_text, "What prints?");
    }

    #[tokio::test]
    async fn test_result_shows_missed_log_and_clears_it() {
        let app = make_app(Arc::new(ScriptedProvider::valid()));
        let mut log = MissedLog::default();
        log.push(MissedQuestion::new(&question(), "1"));
        let req = Request::builder()
            .uri("/resultado?correctas=1&tiempo=42")
            .header(header::COOKIE, missed_cookie(&log))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cleared = set_cookie(&resp, MISSED_COOKIE).expect("log removal");
        assert!(cleared.contains("Max-Age=0"));
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("What prints?"));
        assert!(html.contains("Prints three."));
    }

    #[tokio::test]
    async fn test_error_page_is_500() {
        let app = make_app(Arc::new(ScriptedProvider::valid()));
        let req = Request::builder()
            .uri("/error?detalle=Boom")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Boom"));
    }

    #[tokio::test]
    async fn test_health_reports_cache() {
        let app = make_app(Arc::new(ScriptedProvider::valid()));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["cache"]["capacity"], 200);
        assert_eq!(json["cache"]["low_water"], 100);
        assert_eq!(json["status"], "degraded");
    }
}
