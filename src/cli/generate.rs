//! `codequiz generate`: one generation attempt, printed to stdout.

use std::sync::Arc;

use anyhow::{bail, Result};

use codequiz::providers::GeminiProvider;
use codequiz::quiz::prompt::load_prompt;
use codequiz::quiz::{Generator, Validator};
use codequiz::{Config, GenerationError};

pub(crate) async fn cmd_generate(config: Config) -> Result<()> {
    let provider = GeminiProvider::from_config(&config.gemini)?;
    let prompt = load_prompt(config.gemini.prompt_file.as_deref())?;
    let generator =
        Generator::new(Arc::new(provider), prompt).with_validator(Validator::new(config.validation));

    match generator.generate().await {
        Ok(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Err(err) => {
            if let GenerationError::Parse { raw, .. } = &err {
                eprintln!("Raw completion:\n{raw}");
            }
            if let GenerationError::Invalid(rejected) = &err {
                if let Some(raw) = &rejected.raw {
                    eprintln!("Raw completion:\n{raw}");
                }
            }
            bail!("generation failed: {err}")
        }
    }
}
