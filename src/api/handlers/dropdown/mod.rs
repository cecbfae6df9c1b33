//! `GET /get-dropdown-data`: one level of the administrative geography cascade.
//!
//! The `type` query parameter selects the level; each level requires one
//! companion parameter (`lang`, `countryId` or `parentId`). Every level is
//! returned in the same `[{id, display_name}]` shape.

pub mod countries;
pub mod units;

use axum::{
    Extension, Json,
    extract::RawQuery,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use self::units::AdminUnitType;
use crate::api::{AppState, error::ApiError};

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Normalized dropdown entry.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DropdownOption {
    #[schema(value_type = Object)]
    pub id: Value,
    pub display_name: String,
}

impl DropdownOption {
    pub fn new(id: Value, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Countries,
    Provinces,
    Municipalities,
    MunicipalDistricts,
    LocalUnits,
}

impl DataType {
    pub const ALL: [Self; 5] = [
        Self::Countries,
        Self::Provinces,
        Self::Municipalities,
        Self::MunicipalDistricts,
        Self::LocalUnits,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Countries => "countries",
            Self::Provinces => "provinces",
            Self::Municipalities => "municipalities",
            Self::MunicipalDistricts => "municipal_districts",
            Self::LocalUnits => "local_units",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|data_type| data_type.as_str() == value)
    }
}

/// Query parameters accepted by the dropdown endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DropdownParams {
    /// `countries`, `provinces`, `municipalities`, `municipal_districts` or `local_units`
    #[param(rename = "type")]
    pub data_type: Option<String>,
    /// Two-letter language code, required for `countries`
    pub lang: Option<String>,
    /// Required for `provinces`
    #[param(rename = "countryId")]
    pub country_id: Option<String>,
    /// Required for `municipalities`, `municipal_districts` and `local_units`
    #[param(rename = "parentId")]
    pub parent_id: Option<String>,
}

impl DropdownParams {
    /// Parse a raw query string. The first occurrence of a key wins, an empty
    /// value counts as absent and so does `"null"` for the companion
    /// parameters (`type=null` is an unknown type).
    #[must_use]
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "type" => &mut params.data_type,
                "lang" => &mut params.lang,
                "countryId" => &mut params.country_id,
                "parentId" => &mut params.parent_id,
                _ => continue,
            };

            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        params.data_type = params.data_type.filter(|v| !v.is_empty());
        params.lang = normalize(params.lang);
        params.country_id = normalize(params.country_id);
        params.parent_id = normalize(params.parent_id);
        params
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "null")
}

/// Non-null `id` of a backend row.
pub(crate) fn row_id(row: &Value) -> Option<Value> {
    row.get("id").filter(|id| !id.is_null()).cloned()
}

/// Non-empty string field of a backend row.
pub(crate) fn row_str<'a>(row: &'a Value, key: &str) -> Option<&'a str> {
    row.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn required<'a>(value: Option<&'a String>, message: &str) -> Result<&'a str, ApiError> {
    value
        .map(String::as_str)
        .ok_or_else(|| ApiError::client_input(message))
}

#[utoipa::path(
    get,
    path = "/get-dropdown-data",
    params(DropdownParams),
    responses(
        (status = 200, description = "Options for the requested level", body = [DropdownOption], content_type = "application/json"),
        (status = 400, description = "Missing or invalid parameter", body = crate::api::error::ErrorBody),
        (status = 405, description = "Method not allowed", body = crate::api::error::ErrorBody),
        (status = 500, description = "Backend or configuration error", body = crate::api::error::ErrorBody),
    ),
    tag = "dropdown"
)]
/// Resolve one level of the country → province → municipality → district →
/// local unit cascade.
///
/// Parameters are validated before any backend call. Backend errors surface as
/// `500` with the backend's message.
#[instrument(skip(state))]
pub async fn dropdown(
    Extension(state): Extension<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let client = state
        .backend
        .with_service_role()
        .ok_or(ApiError::Configuration)?;

    let params = DropdownParams::from_query(query.as_deref());
    debug!("dropdown params: {:?}", params);

    let data_type = params
        .data_type
        .as_deref()
        .ok_or_else(|| ApiError::client_input("\"type\" parameter is required"))?;

    let options = match DataType::parse(data_type) {
        Some(DataType::Countries) => {
            let language = required(params.lang.as_ref(), "\"lang\" is required for countries")?;
            countries::lookup(&client, language).await?
        }
        Some(DataType::Provinces) => {
            let country_id = required(
                params.country_id.as_ref(),
                "\"countryId\" is required for provinces",
            )?;
            units::provinces(&client, country_id).await?
        }
        Some(DataType::Municipalities) => {
            let parent_id = required(
                params.parent_id.as_ref(),
                "\"parentId\" (provinceId) is required for municipalities",
            )?;
            units::children(&client, parent_id, &[AdminUnitType::Municipality], None).await?
        }
        Some(DataType::MunicipalDistricts) => {
            let parent_id = required(
                params.parent_id.as_ref(),
                "\"parentId\" (municipalityId) is required for municipal districts",
            )?;
            units::children(&client, parent_id, &[AdminUnitType::MunicipalDistrict], None).await?
        }
        Some(DataType::LocalUnits) => {
            let parent_id = required(
                params.parent_id.as_ref(),
                "\"parentId\" (municipalityId or districtId) is required for local units",
            )?;
            units::children(
                &client,
                parent_id,
                &AdminUnitType::LOCAL_UNITS,
                Some(state.unit_labels),
            )
            .await?
        }
        None => return Err(ApiError::client_input("Invalid \"type\" specified")),
    };

    Ok(([(CONTENT_TYPE, JSON_UTF8)], Json(options)).into_response())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method Not Allowed")
}
