use crate::api::handlers::dropdown::units::LabelLanguage;
use clap::{Arg, Command, builder::PossibleValuesParser};

pub const ARG_BACKEND_URL: &str = "backend-url";
pub const ARG_SERVICE_ROLE_KEY: &str = "service-role-key";
pub const ARG_UNIT_LABEL_LANGUAGE: &str = "unit-label-language";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BACKEND_URL)
                .long(ARG_BACKEND_URL)
                .help("Backend base URL, e.g. https://<project>.supabase.co")
                .env("ONBOARD_BACKEND_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SERVICE_ROLE_KEY)
                .long(ARG_SERVICE_ROLE_KEY)
                .help("Backend service role key")
                .long_help(
                    "Backend service role key. Sent as `apikey` on every backend call and as the bearer token for dropdown lookups. Without it /get-dropdown-data answers 500.",
                )
                .env("ONBOARD_SERVICE_ROLE_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_UNIT_LABEL_LANGUAGE)
                .long(ARG_UNIT_LABEL_LANGUAGE)
                .help("Language of the category prefix on local units")
                .env("ONBOARD_UNIT_LABEL_LANGUAGE")
                .default_value(LabelLanguage::Es.as_str())
                .value_parser(PossibleValuesParser::new(LabelLanguage::VALUES)),
        )
}
