//! Quiz route handlers.

use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::cache::CacheStats;
use crate::error::QuizError;
use crate::health::HealthReport;

use super::server::AppState;
use super::session::{Graded, QuizSession, SessionCodec};
use super::views;

/// Where a request goes when no usable question could be produced.
pub const RETRY_EXHAUSTED_URL: &str = "/error?detalle=L%C3%ADmite%20de%20intentos%20superado&texto=No%20se%20pudo%20generar%20una%20pregunta%20v%C3%A1lida.%20Por%20favor%20intente%20nuevamente%20m%C3%A1s%20tarde.";

fn internal_error(err: QuizError) -> Response {
    error!(error = %err, "Request failed");
    Redirect::to("/error?detalle=Error%20interno").into_response()
}

/// `GET /`: landing page; drops any previous session.
pub async fn index(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    (
        SessionCodec::clear(jar),
        views::index_page(state.quiz_length),
    )
}

/// `GET /quiz`: show the current question, starting a quiz if needed.
pub async fn quiz_get(State(state): State<Arc<AppState>>, mut jar: CookieJar) -> Response {
    let mut session = state.sessions.read(&jar);

    let usable = session
        .current
        .as_ref()
        .is_some_and(|q| state.validator.is_valid_record(q));
    if !session.is_active() || !usable {
        let question = match state.orchestrator.obtain_with_retry().await {
            Ok(q) => q,
            Err(err) => {
                warn!(error = %err, "Could not obtain a question for a new page");
                return Redirect::to(RETRY_EXHAUSTED_URL).into_response();
            }
        };
        if session.is_active() {
            session.current = Some(question);
        } else {
            debug!("Starting new quiz session");
            session = QuizSession::start(question);
            jar = SessionCodec::clear(jar);
        }
    }

    let Some(question) = session.current.as_ref() else {
        return Redirect::to("/").into_response();
    };
    let page = views::question_page(question, session.total + 1, state.quiz_length);
    match state.sessions.store(jar, &session) {
        Ok(jar) => (jar, page).into_response(),
        Err(err) => internal_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    pub respuesta: String,
}

/// `POST /quiz`: grade the answer, then move on or finish.
pub async fn quiz_post(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<AnswerForm>,
) -> Response {
    let mut session = state.sessions.read(&jar);
    if !session.is_active() {
        return Redirect::to("/").into_response();
    }

    let mut missed = state.sessions.read_missed(&jar);
    let correct = match session.record_answer(&form.respuesta) {
        Some(Graded::Missed(m)) => {
            missed.push(m);
            false
        }
        Some(Graded::Correct) => true,
        None => false,
    };
    debug!(correct, total = session.total, score = session.score, "Answer graded");

    let jar = if correct {
        jar
    } else {
        match state.sessions.store_missed(jar, &missed) {
            Ok(jar) => jar,
            Err(err) => return internal_error(err),
        }
    };

    if session.total >= state.quiz_length {
        let url = format!(
            "/resultado?correctas={}&tiempo={}",
            session.score,
            session.elapsed_secs()
        );
        return (SessionCodec::clear_session(jar), Redirect::to(&url)).into_response();
    }

    match state.orchestrator.obtain_with_retry().await {
        Ok(next) => session.current = Some(next),
        Err(err) => {
            warn!(error = %err, "Could not obtain the next question");
            return Redirect::to(RETRY_EXHAUSTED_URL).into_response();
        }
    }
    match state.sessions.store(jar, &session) {
        Ok(jar) => (jar, Redirect::to("/quiz")).into_response(),
        Err(err) => internal_error(err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResultQuery {
    pub correctas: u32,
    pub tiempo: u64,
}

/// `GET /resultado`: final score; consumes the missed-question log.
pub async fn result(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ResultQuery>,
) -> impl IntoResponse {
    let missed = state.sessions.read_missed(&jar);
    (
        SessionCodec::clear(jar),
        views::result_page(query.correctas, query.tiempo, &missed),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorQuery {
    pub detalle: String,
    pub texto: String,
}

/// `GET /error`: generic failure page, always HTTP 500.
pub async fn error_page(Query(query): Query<ErrorQuery>) -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        views::error_page(&query.detalle, &query.texto),
    )
}

/// `GET /health`: cache occupancy and pipeline counters.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let stats = CacheStats::snapshot(state.orchestrator.cache(), state.low_water);
    Json(HealthReport::build(stats, &state.metrics, state.started))
}
