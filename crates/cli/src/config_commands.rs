use std::path::Path;

use {anyhow::Result, onika_config::OnikaConfig};

use onika_config::{Severity, validate};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// `explicit` is the `--config` path, if one was given.
pub fn check(config: &OnikaConfig, explicit: Option<&Path>) -> Result<()> {
    match explicit
        .map(Path::to_path_buf)
        .or_else(onika_config::find_config_file)
    {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let result = validate(config);
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if !result.diagnostics.is_empty() {
        eprintln!();
    }
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if config.telegram.resolve_token().is_none() {
        eprintln!("note: no Telegram token (telegram.token or TELEGRAM_TOKEN); poll mode will not start");
    }

    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
