//! Country list with translated names.
//!
//! Translation data may be missing for a language, so the lookup walks an
//! ordered list of strategies ([`COUNTRY_TIERS`]) and stops at the first one
//! that produces usable rows. Only the failure of the last tier reaches the
//! caller.

use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{DropdownOption, row_id, row_str};
use crate::{
    api::error::ApiError,
    backend::{self, Client, TableQuery},
};

const COUNTRIES_FAILED: &str = "Failed to fetch countries.";
const TRANSLATIONS: &str = "country_translations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryTier {
    /// Countries embedded with their translation for the requested language.
    Translated,
    /// Left-joined translations accepting the requested language or none.
    LeftJoined,
    /// Codes only; the display name is the country code.
    CodesOnly,
}

pub const COUNTRY_TIERS: [CountryTier; 3] = [
    CountryTier::Translated,
    CountryTier::LeftJoined,
    CountryTier::CodesOnly,
];

#[derive(Debug)]
pub enum TierOutcome {
    Found(Vec<DropdownOption>),
    /// The query succeeded but this tier does not accept an empty result.
    Empty,
    Failed(backend::Error),
}

impl CountryTier {
    #[must_use]
    pub fn query(self, language: &str) -> TableQuery {
        let same_language = format!("language_code.eq.{language}");

        let base = match self {
            Self::Translated => TableQuery::new(
                "countries",
                "id, code, country_translations(translated_name)",
            )
            .eq("is_deleted", false)
            .eq("country_translations.language_code", language),
            Self::LeftJoined => TableQuery::new(
                "countries",
                "id, code, country_translations!left(translated_name)",
            )
            .eq("is_deleted", false)
            .or(
                TRANSLATIONS,
                &[same_language.as_str(), "language_code.is.null"],
            ),
            Self::CodesOnly => TableQuery::new("countries", "id, code").eq("is_deleted", false),
        };

        base.order("code")
    }

    const fn accepts_empty(self) -> bool {
        !matches!(self, Self::Translated)
    }

    /// Shape raw country rows into options for this tier.
    #[must_use]
    pub fn format(self, rows: &[Value]) -> Vec<DropdownOption> {
        rows.iter()
            .filter_map(|row| {
                let id = row_id(row)?;
                let code = row_str(row, "code");
                let translated = match self {
                    Self::Translated => translations(row)
                        .first()
                        .and_then(|t| row_str(t, "translated_name")),
                    Self::LeftJoined => translations(row)
                        .iter()
                        .find_map(|t| row_str(t, "translated_name")),
                    Self::CodesOnly => None,
                };

                match translated.or(code) {
                    Some(name) => Some(DropdownOption::new(id, name)),
                    None => {
                        warn!("Skipping country without code or translation: {row}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Run this tier's query and classify the result.
    pub async fn attempt(self, client: &Client, language: &str) -> TierOutcome {
        match client.select(&self.query(language)).await {
            Ok(rows) if rows.is_empty() && !self.accepts_empty() => TierOutcome::Empty,
            Ok(rows) => TierOutcome::Found(self.format(&rows)),
            Err(err) => TierOutcome::Failed(err),
        }
    }
}

/// Translation rows embedded in a country row. PostgREST returns an array for
/// one-to-many embeds and an object for one-to-one.
fn translations(row: &Value) -> Vec<&Value> {
    match row.get(TRANSLATIONS) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

#[must_use]
pub fn valid_language(language: &str) -> bool {
    Regex::new(r"^[a-z]{2}$").is_ok_and(|re| re.is_match(language))
}

/// Countries ordered by code, named in `language` where a translation exists.
/// # Errors
/// Returns [`ApiError::ClientInput`] for a malformed language code, or the last
/// tier's failure when every tier fails.
pub async fn lookup(client: &Client, language: &str) -> Result<Vec<DropdownOption>, ApiError> {
    lookup_with(client, language, &COUNTRY_TIERS).await
}

pub(super) async fn lookup_with(
    client: &Client,
    language: &str,
    tiers: &[CountryTier],
) -> Result<Vec<DropdownOption>, ApiError> {
    if !valid_language(language) {
        return Err(ApiError::client_input("Invalid \"lang\" format."));
    }

    let mut last_error = None;

    for tier in tiers {
        match tier.attempt(client, language).await {
            TierOutcome::Found(options) => {
                debug!("Countries resolved by {:?} tier", tier);
                return Ok(options);
            }
            TierOutcome::Empty => {
                warn!("{:?} tier returned no countries for {language}", tier);
            }
            TierOutcome::Failed(err) => {
                warn!("{:?} tier failed for {language}: {err}", tier);
                last_error = Some(err);
            }
        }
    }

    let err = last_error.map_or_else(
        || ApiError::Backend(COUNTRIES_FAILED.to_string()),
        |err| {
            error!("Error fetching countries: {err}");
            ApiError::from_backend(&err, COUNTRIES_FAILED)
        },
    );

    Err(err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TRANSLATED_SELECT: &str = "id,code,country_translations(translated_name)";
    const LEFT_JOINED_SELECT: &str = "id,code,country_translations!left(translated_name)";
    const CODES_SELECT: &str = "id,code";

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client(server: &MockServer) -> Client {
        Client::new(&server.uri(), Some(SecretString::from("service-key".to_string())))
            .unwrap()
            .with_service_role()
            .unwrap()
    }

    async fn mount_tier(server: &MockServer, select: &str, response: ResponseTemplate, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/countries"))
            .and(query_param("select", select))
            .respond_with(response)
            .expect(calls)
            .mount(server)
            .await;
    }

    fn backend_error(message: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({ "message": message }))
    }

    #[test]
    fn language_format() {
        assert!(valid_language("es"));
        assert!(valid_language("en"));
        assert!(!valid_language("ES"));
        assert!(!valid_language("esp"));
        assert!(!valid_language("e"));
        assert!(!valid_language("e1"));
    }

    #[test]
    fn tier_queries() {
        let pairs = CountryTier::Translated.query("es").to_pairs();
        assert!(pairs.contains(&("select".to_string(), TRANSLATED_SELECT.to_string())));
        assert!(pairs.contains(&(
            "country_translations.language_code".to_string(),
            "eq.es".to_string()
        )));
        assert!(pairs.contains(&("is_deleted".to_string(), "eq.false".to_string())));
        assert!(pairs.contains(&("order".to_string(), "code.asc".to_string())));

        let pairs = CountryTier::LeftJoined.query("es").to_pairs();
        assert!(pairs.contains(&(
            "country_translations.or".to_string(),
            "(language_code.eq.es,language_code.is.null)".to_string()
        )));

        let pairs = CountryTier::CodesOnly.query("es").to_pairs();
        assert_eq!(pairs[0], ("select".to_string(), CODES_SELECT.to_string()));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn translated_tier_uses_first_translation_or_code() {
        let rows = vec![
            json!({ "id": 1, "code": "DO", "country_translations": [{ "translated_name": "República Dominicana" }] }),
            json!({ "id": 2, "code": "HT", "country_translations": [] }),
            json!({ "id": 3, "code": "PR", "country_translations": [{ "translated_name": "" }] }),
        ];
        assert_eq!(
            CountryTier::Translated.format(&rows),
            vec![
                DropdownOption::new(json!(1), "República Dominicana"),
                DropdownOption::new(json!(2), "HT"),
                DropdownOption::new(json!(3), "PR"),
            ]
        );
    }

    #[test]
    fn left_joined_tier_picks_any_non_empty_translation() {
        let rows = vec![
            json!({ "id": 1, "code": "DO", "country_translations": [
                { "translated_name": null },
                { "translated_name": "Dominican Republic" }
            ] }),
            json!({ "id": 2, "code": "HT", "country_translations": { "translated_name": "Haití" } }),
            json!({ "id": 3, "code": "CU" }),
        ];
        assert_eq!(
            CountryTier::LeftJoined.format(&rows),
            vec![
                DropdownOption::new(json!(1), "Dominican Republic"),
                DropdownOption::new(json!(2), "Haití"),
                DropdownOption::new(json!(3), "CU"),
            ]
        );
    }

    #[test]
    fn codes_only_tier_ignores_translations() {
        let rows = vec![
            json!({ "id": 1, "code": "DO", "country_translations": [{ "translated_name": "RD" }] }),
            json!({ "id": null, "code": "XX" }),
            json!({ "id": 5 }),
        ];
        assert_eq!(
            CountryTier::CodesOnly.format(&rows),
            vec![DropdownOption::new(json!(1), "DO")]
        );
    }

    #[tokio::test]
    async fn invalid_language_makes_no_backend_calls() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let err = lookup(&client(&server), "ES").await.unwrap_err();
        assert!(matches!(&err, ApiError::ClientInput(m) if m == "Invalid \"lang\" format."));
        Ok(())
    }

    #[tokio::test]
    async fn first_tier_with_rows_wins() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_tier(
            &server,
            TRANSLATED_SELECT,
            ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "code": "DO", "country_translations": [{ "translated_name": "República Dominicana" }] }
            ])),
            1,
        )
        .await;
        mount_tier(&server, LEFT_JOINED_SELECT, ResponseTemplate::new(200), 0).await;
        mount_tier(&server, CODES_SELECT, ResponseTemplate::new(200), 0).await;

        let options = lookup(&client(&server), "es").await?;
        assert_eq!(
            options,
            vec![DropdownOption::new(json!(1), "República Dominicana")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn empty_first_tier_falls_back_to_left_join() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_tier(
            &server,
            TRANSLATED_SELECT,
            ResponseTemplate::new(200).set_body_json(json!([])),
            1,
        )
        .await;
        mount_tier(
            &server,
            LEFT_JOINED_SELECT,
            ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "code": "DO", "country_translations": [] }
            ])),
            1,
        )
        .await;
        mount_tier(&server, CODES_SELECT, ResponseTemplate::new(200), 0).await;

        let options = lookup(&client(&server), "fr").await?;
        assert_eq!(options, vec![DropdownOption::new(json!(1), "DO")]);
        Ok(())
    }

    #[tokio::test]
    async fn failing_tiers_fall_through_to_codes() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_tier(&server, TRANSLATED_SELECT, backend_error("relation missing"), 1).await;
        mount_tier(&server, LEFT_JOINED_SELECT, backend_error("bad or filter"), 1).await;
        mount_tier(
            &server,
            CODES_SELECT,
            ResponseTemplate::new(200).set_body_json(json!([
                { "id": 2, "code": "CU" },
                { "id": 1, "code": "DO" }
            ])),
            1,
        )
        .await;

        let options = lookup(&client(&server), "es").await?;
        assert_eq!(
            options,
            vec![
                DropdownOption::new(json!(2), "CU"),
                DropdownOption::new(json!(1), "DO"),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn failing_codes_tier_surfaces_its_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_tier(&server, TRANSLATED_SELECT, backend_error("first"), 1).await;
        mount_tier(&server, LEFT_JOINED_SELECT, backend_error("second"), 1).await;
        mount_tier(&server, CODES_SELECT, backend_error("permission denied"), 1).await;

        let err = lookup(&client(&server), "es").await.unwrap_err();
        assert!(matches!(&err, ApiError::Backend(m) if m == "permission denied"));
        Ok(())
    }

    #[tokio::test]
    async fn codes_tier_without_message_uses_default() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_tier(&server, CODES_SELECT, ResponseTemplate::new(500), 1).await;

        let err = lookup_with(&client(&server), "es", &[CountryTier::CodesOnly])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), COUNTRIES_FAILED);
        Ok(())
    }

    #[tokio::test]
    async fn single_tier_in_isolation() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_tier(
            &server,
            TRANSLATED_SELECT,
            ResponseTemplate::new(200).set_body_json(json!([])),
            1,
        )
        .await;

        let outcome = CountryTier::Translated.attempt(&client(&server), "es").await;
        assert!(matches!(outcome, TierOutcome::Empty));
        Ok(())
    }
}
