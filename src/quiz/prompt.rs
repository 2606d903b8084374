//! Instruction payload sent to the model.
//!
//! The payload is configuration: `gemini.prompt_file` replaces it wholesale.
//! Whatever it says, it must ask for a single JSON object using the keys
//! understood by [`super::parse`].

use std::path::Path;

use crate::error::{QuizError, Result};

/// Built-in instruction payload.
pub const DEFAULT_PROMPT: &str = r#"You write multiple-choice code-reading questions for intermediate university students.

1. Write a self-contained Python snippet of 8 to 18 executable lines that defines at least two functions and manipulates a data structure.
2. Trace its execution step by step and determine its exact output.
3. Ask one clear question about that output.
4. Give exactly four plausible options, one of which matches the real output exactly.
5. Explain briefly why the correct option is right.

Reply with one JSON object and nothing else:

{
  "Pregunta": "question text",
  "Codigo": "python code",
  "Respuestas": ["A", "B", "C", "D"],
  "Respuesta correcta": "must equal one of the options",
  "Explicacion": "short explanation"
}
"#;

/// Read the payload from `path`, or use [`DEFAULT_PROMPT`].
pub fn load_prompt(path: Option<&Path>) -> Result<String> {
    match path {
        None => Ok(DEFAULT_PROMPT.to_string()),
        Some(p) => {
            let text = std::fs::read_to_string(p)?;
            if text.trim().is_empty() {
                return Err(QuizError::Config(format!(
                    "prompt file {} is empty",
                    p.display()
                )));
            }
            Ok(text)
        }
    }
}
