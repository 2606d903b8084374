//! `codequiz config`: show the effective configuration.

use anyhow::Result;

use codequiz::Config;

pub(crate) fn cmd_config(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    redact(&mut shown);
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

fn redact(config: &mut Config) {
    let mask = |v: &mut Option<String>| {
        if v.is_some() {
            *v = Some("[REDACTED]".to_string());
        }
    };
    mask(&mut config.gemini.api_key);
    mask(&mut config.gemini.bearer_token);
    mask(&mut config.server.session_secret);
}
