//! HTML pages.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::quiz::QuestionRecord;

use super::session::MissedLog;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }
pre { background: #f4f4f4; padding: 1rem; overflow-x: auto; }
.option { display: block; margin: .4rem 0; }
.muted { color: #666; }
.explanation { margin: .3rem 0 .8rem; }
"#;

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="es" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body { (body) }
        }
    }
}

/// Landing page.
pub fn index_page(quiz_length: u32) -> Markup {
    layout(
        "Quiz de análisis de código",
        html! {
            h1 { "Quiz de análisis de código" }
            p { "Responde " (quiz_length) " preguntas sobre fragmentos de código Python." }
            a href="/quiz" { "Comenzar" }
        },
    )
}

/// Question page. `number` is 1-based.
pub fn question_page(question: &QuestionRecord, number: u32, quiz_length: u32) -> Markup {
    layout(
        "Pregunta",
        html! {
            p.muted { "Pregunta " (number) " de " (quiz_length) }
            h2 { (question.prompt_text) }
            pre { code { (question.code_block) } }
            form method="post" action="/quiz" {
                @for (i, option) in question.answer_options.iter().enumerate() {
                    label.option {
                        input type="radio" name="respuesta" value=(option) required[i == 0];
                        " " (option)
                    }
                }
                button type="submit" { "Responder" }
            }
        },
    )
}

/// Final score page.
pub fn result_page(correct: u32, seconds: u64, missed: &MissedLog) -> Markup {
    layout(
        "Resultado",
        html! {
            h1 { "Resultado" }
            p { "Respuestas correctas: " strong { (correct) } }
            p { "Tiempo: " (seconds / 60) " min " (seconds % 60) " s" }
            @if !missed.is_empty() {
                h2 { "Preguntas falladas" }
                ul {
                    @for m in &missed.entries {
                        li {
                            (m.prompt_text)
                            br;
                            span.muted { "Tu respuesta: " (m.selected) " · Correcta: " (m.correct_answer) }
                            @if !m.explanation.is_empty() {
                                p.explanation { (m.explanation) }
                            }
                        }
                    }
                }
                @if missed.omitted > 0 {
                    p.muted { "Y " (missed.omitted) " preguntas falladas más." }
                }
            }
            a href="/" { "Volver al inicio" }
        },
    )
}

/// Generic error page.
pub fn error_page(detail: &str, text: &str) -> Markup {
    layout(
        "Error",
        html! {
            h1 { "Servicio no disponible temporalmente" }
            @if !detail.is_empty() { p { strong { (detail) } } }
            @if !text.is_empty() { p { (text) } }
            a href="/" { "Volver al inicio" }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::session::MissedQuestion;

    fn question() -> QuestionRecord {
        QuestionRecord {
            prompt_text: "¿Qué imprime?".into(),
            code_block: "print(\"<b>\")".into(),
            answer_options: vec!["<b>".into(), "b".into(), "None".into(), "Error".into()],
            correct_answer: "<b>".into(),
            explanation: "Imprime la cadena literal.".into(),
        }
    }

    #[test]
    fn test_question_page_escapes_code_and_options() {
        let html = question_page(&question(), 3, 10).into_string();
        assert!(html.contains("Pregunta 3 de 10"));
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
        assert_eq!(html.matches("name=\"respuesta\"").count(), 4);
    }

    #[test]
    fn test_result_page_lists_missed_questions_with_explanation() {
        let mut missed = MissedLog::default();
        missed.push(MissedQuestion::new(&question(), "b"));
        let html = result_page(7, 125, &missed).into_string();
        assert!(html.contains("<strong>7</strong>"));
        assert!(html.contains("2 min 5 s"));
        assert!(html.contains("¿Qué imprime?"));
        assert!(html.contains("Imprime la cadena literal."));
    }

    #[test]
    fn test_result_page_counts_omitted_misses() {
        let missed = MissedLog {
            entries: Vec::new(),
            omitted: 3,
        };
        let html = result_page(5, 60, &missed).into_string();
        assert!(html.contains("Y 3 preguntas falladas más."));
    }

    #[test]
    fn test_error_page_shows_detail() {
        let html = error_page("Límite de intentos superado", "").into_string();
        assert!(html.contains("Límite de intentos superado"));
    }
}
