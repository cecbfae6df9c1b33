use crate::{
    api::{self, AppState, handlers::dropdown::units::LabelLanguage},
    backend,
    cli::telemetry,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend_url: String,
    pub service_role_key: Option<SecretString>,
    pub unit_labels: LabelLanguage,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the backend client cannot be built or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    if args.service_role_key.is_none() {
        warn!("No service role key configured: /get-dropdown-data will answer 500");
    }

    let client = backend::Client::new(&args.backend_url, args.service_role_key)
        .context("Invalid backend configuration")?;

    let state = AppState {
        backend: client,
        unit_labels: args.unit_labels,
    };

    let result = api::new(args.port, state).await;
    telemetry::shutdown_tracer();
    result
}

fn log_startup_args(args: &Args) {
    info!("{}", startup_message(&startup_entries(args)));
}

fn startup_entries(args: &Args) -> [(&'static str, String); 4] {
    [
        ("listen", format!("tcp:{}", args.port)),
        ("backend_url", redact_url(&args.backend_url)),
        (
            "service_role_key_set",
            args.service_role_key.is_some().to_string(),
        ),
        ("unit_label_language", args.unit_labels.as_str().to_string()),
    ]
}

// Credentials embedded in the URL never reach the logs.
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-url".to_string(),
    }
}

fn startup_message(entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\nStartup configuration:", banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const BANNER: &str = r"
  +---+---+
  | o | o |
  +---+---+   O N B O A R D {VERSION}
  | o | o |
  +---+---+";
