//! Signed cookie session.
//!
//! Quiz state lives client-side in HttpOnly cookies holding HS256 JWTs. The
//! progress cookie carries the question on screen; a second cookie carries
//! the missed-question log until the result page. A missing, tampered or
//! expired cookie reads as empty.
//!
//! Tokens are signed, not encrypted: whoever holds the cookie can read its
//! claims, including the correct answer of the question on screen.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QuizError, Result};
use crate::quiz::QuestionRecord;

/// Name of the progress cookie.
pub const SESSION_COOKIE: &str = "quiz_session";

/// Name of the missed-question log cookie.
pub const MISSED_COOKIE: &str = "quiz_missed";

/// Browsers drop cookies whose `name=value` exceeds this many bytes.
pub const MAX_COOKIE_BYTES: usize = 4096;

const PROMPT_CHARS: usize = 160;
const EXPLANATION_CHARS: usize = 240;
const ANSWER_CHARS: usize = 80;

fn clip(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// A question the user answered wrongly. Text fields are clipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedQuestion {
    pub prompt_text: String,
    pub selected: String,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl MissedQuestion {
    pub fn new(question: &QuestionRecord, selection: &str) -> Self {
        Self {
            prompt_text: clip(&question.prompt_text, PROMPT_CHARS),
            selected: clip(selection, ANSWER_CHARS),
            correct_answer: clip(&question.correct_answer, ANSWER_CHARS),
            explanation: clip(&question.explanation, EXPLANATION_CHARS),
        }
    }
}

/// Outcome of grading one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Graded {
    Correct,
    Missed(MissedQuestion),
}

/// Per-user quiz progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    /// Correct answers so far.
    pub score: u32,
    /// Questions answered so far.
    pub total: u32,
    /// Unix timestamp when the quiz started.
    pub started_at: i64,
    /// Question currently displayed.
    pub current: Option<QuestionRecord>,
}

impl QuizSession {
    /// Fresh session starting now with `first` on screen.
    pub fn start(first: QuestionRecord) -> Self {
        Self {
            started_at: chrono::Utc::now().timestamp(),
            current: Some(first),
            ..Self::default()
        }
    }

    /// A quiz is in progress.
    pub fn is_active(&self) -> bool {
        self.started_at > 0 && self.current.is_some()
    }

    /// Grade `selection` against the current question and advance the
    /// counters. `None` when no question is on screen.
    pub fn record_answer(&mut self, selection: &str) -> Option<Graded> {
        let current = self.current.as_ref()?;
        let graded = if current.is_correct(selection) {
            Graded::Correct
        } else {
            Graded::Missed(MissedQuestion::new(current, selection))
        };
        self.total += 1;
        if graded == Graded::Correct {
            self.score += 1;
        }
        Some(graded)
    }

    /// Whole seconds since the quiz started.
    pub fn elapsed_secs(&self) -> u64 {
        (chrono::Utc::now().timestamp() - self.started_at).max(0) as u64
    }
}

/// Wrong answers of the running quiz, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedLog {
    pub entries: Vec<MissedQuestion>,
    /// Entries shed to fit the cookie.
    #[serde(default)]
    pub omitted: u32,
}

impl MissedLog {
    pub fn push(&mut self, missed: MissedQuestion) {
        self.entries.push(missed);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.omitted == 0
    }

    /// Drop the oldest explanation, then the oldest entry. `false` when
    /// nothing is left to drop.
    fn shed(&mut self) -> bool {
        if let Some(m) = self.entries.iter_mut().find(|m| !m.explanation.is_empty()) {
            m.explanation.clear();
            return true;
        }
        if self.entries.is_empty() {
            return false;
        }
        self.entries.remove(0);
        self.omitted += 1;
        true
    }
}

#[derive(Serialize, Deserialize)]
struct Claims<T> {
    #[serde(flatten)]
    data: T,
    exp: u64,
}

fn fits(name: &str, token: &str) -> bool {
    name.len() + 1 + token.len() <= MAX_COOKIE_BYTES
}

/// Encodes and decodes session cookies.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age_secs: u64,
}

impl SessionCodec {
    pub fn new(secret: &str, max_age_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            max_age_secs,
        }
    }

    /// Sign `data` with a fresh expiry.
    pub fn encode<T: Serialize>(&self, data: &T) -> Result<String> {
        let claims = Claims {
            data,
            exp: (chrono::Utc::now().timestamp().max(0) as u64).saturating_add(self.max_age_secs),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| QuizError::Session(format!("JWT encode: {e}")))
    }

    /// Verify and decode a token. Any failure yields `None`.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        match decode::<Claims<T>>(token, &self.decoding, &Validation::default()) {
            Ok(data) => Some(data.claims.data),
            Err(e) => {
                debug!(error = %e, "Discarding invalid session cookie");
                None
            }
        }
    }

    fn read_cookie<T: DeserializeOwned + Default>(&self, jar: &CookieJar, name: &str) -> T {
        jar.get(name)
            .and_then(|c| self.decode(c.value()))
            .unwrap_or_default()
    }

    fn cookie(&self, name: &'static str, token: String) -> Cookie<'static> {
        Cookie::build((name, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(
                i64::try_from(self.max_age_secs).unwrap_or(i64::MAX),
            ))
            .build()
    }

    /// The session carried by `jar`, or an empty one.
    pub fn read(&self, jar: &CookieJar) -> QuizSession {
        self.read_cookie(jar, SESSION_COOKIE)
    }

    /// The missed-question log carried by `jar`, or an empty one.
    pub fn read_missed(&self, jar: &CookieJar) -> MissedLog {
        self.read_cookie(jar, MISSED_COOKIE)
    }

    /// Add the signed session cookie to `jar`.
    pub fn store(&self, jar: CookieJar, session: &QuizSession) -> Result<CookieJar> {
        let token = self.encode(session)?;
        if !fits(SESSION_COOKIE, &token) {
            return Err(QuizError::Session(format!(
                "session cookie of {} bytes exceeds the browser limit",
                token.len()
            )));
        }
        Ok(jar.add(self.cookie(SESSION_COOKIE, token)))
    }

    /// Add the signed missed-question log to `jar`, shedding old detail
    /// until it fits in one cookie.
    pub fn store_missed(&self, jar: CookieJar, log: &MissedLog) -> Result<CookieJar> {
        let mut token = self.encode(log)?;
        if !fits(MISSED_COOKIE, &token) {
            let mut fitted = log.clone();
            while !fits(MISSED_COOKIE, &token) {
                if !fitted.shed() {
                    return Err(QuizError::Session(
                        "missed-question log does not fit in a cookie".into(),
                    ));
                }
                token = self.encode(&fitted)?;
            }
            debug!(
                kept = fitted.entries.len(),
                omitted = fitted.omitted,
                "Trimmed missed-question log"
            );
        }
        Ok(jar.add(self.cookie(MISSED_COOKIE, token)))
    }

    /// Remove the progress cookie.
    pub fn clear_session(jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    /// Remove both cookies.
    pub fn clear(jar: CookieJar) -> CookieJar {
        Self::clear_session(jar).remove(Cookie::build(MISSED_COOKIE).path("/"))
    }
}
