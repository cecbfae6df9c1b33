use crate::{
    api::handlers::dropdown::units::LabelLanguage,
    cli::{
        actions::{Action, server::Args},
        commands::{ARG_PORT, backend},
    },
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let backend_url = matches
        .get_one::<String>(backend::ARG_BACKEND_URL)
        .cloned()
        .context("missing required argument: --backend-url")?;

    let service_role_key = matches
        .get_one::<String>(backend::ARG_SERVICE_ROLE_KEY)
        .filter(|key| !key.trim().is_empty())
        .map(|key| SecretString::from(key.clone()));

    let unit_labels = matches
        .get_one::<String>(backend::ARG_UNIT_LABEL_LANGUAGE)
        .map(|value| value.parse::<LabelLanguage>())
        .transpose()
        .map_err(|e| anyhow!(e))?
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        backend_url,
        service_role_key,
        unit_labels,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn dispatch(args: &[&str]) -> Args {
        let matches = commands::new().get_matches_from(args);
        let Action::Server(args) = handler(&matches).unwrap();
        args
    }

    #[test]
    fn builds_server_action() {
        temp_env::with_vars_unset(["ONBOARD_PORT", "ONBOARD_UNIT_LABEL_LANGUAGE"], || {
            let args = dispatch(&[
                "onboard",
                "--backend-url",
                "https://project.supabase.co",
                "--service-role-key",
                "service-key",
            ]);
            assert_eq!(args.port, 8080);
            assert_eq!(args.backend_url, "https://project.supabase.co");
            assert_eq!(
                args.service_role_key
                    .as_ref()
                    .map(|key| key.expose_secret().to_string()),
                Some("service-key".to_string())
            );
            assert_eq!(args.unit_labels, LabelLanguage::Es);
        });
    }

    #[test]
    fn blank_service_key_is_absent() {
        temp_env::with_vars_unset(["ONBOARD_PORT", "ONBOARD_UNIT_LABEL_LANGUAGE"], || {
            let args = dispatch(&[
                "onboard",
                "--backend-url",
                "http://localhost:54321",
                "--service-role-key",
                "  ",
                "--unit-label-language",
                "en",
            ]);
            assert!(args.service_role_key.is_none());
            assert_eq!(args.unit_labels, LabelLanguage::En);
        });
    }
}
