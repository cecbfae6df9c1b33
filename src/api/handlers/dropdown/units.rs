//! Administrative unit lookups: provinces by country and direct children of a
//! unit via the `get_direct_admin_children` remote procedure.

use serde_json::{Value, json};
use std::{fmt, str::FromStr};
use tracing::{error, warn};

use super::{DropdownOption, row_id, row_str};
use crate::{
    api::error::ApiError,
    backend::{Client, TableQuery},
};

pub const CHILDREN_RPC: &str = "get_direct_admin_children";

const PROVINCES_FAILED: &str = "Failed to fetch provinces.";
const CHILDREN_FAILED: &str = "Failed to fetch children units.";

/// Values of the `unit_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminUnitType {
    Country,
    Province,
    Municipality,
    MunicipalDistrict,
    Section,
    Neighborhood,
}

impl AdminUnitType {
    pub const ALL: [Self; 6] = [
        Self::Country,
        Self::Province,
        Self::Municipality,
        Self::MunicipalDistrict,
        Self::Section,
        Self::Neighborhood,
    ];

    /// Unit types shown together as "local units".
    pub const LOCAL_UNITS: [Self; 2] = [Self::Section, Self::Neighborhood];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Country => "COUNTRY",
            Self::Province => "PROVINCE",
            Self::Municipality => "MUNICIPALITY",
            Self::MunicipalDistrict => "MUNICIPAL_DISTRICT",
            Self::Section => "SECTION",
            Self::Neighborhood => "NEIGHBORHOOD",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.as_str() == value)
    }
}

impl fmt::Display for AdminUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language of the category prefix used for local units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelLanguage {
    #[default]
    Es,
    En,
}

const ES_LABELS: &[(AdminUnitType, &str)] = &[
    (AdminUnitType::Section, "Sección"),
    (AdminUnitType::Neighborhood, "Barrio"),
];

const EN_LABELS: &[(AdminUnitType, &str)] = &[
    (AdminUnitType::Section, "Section"),
    (AdminUnitType::Neighborhood, "Neighborhood"),
];

impl LabelLanguage {
    pub const VALUES: [&'static str; 2] = ["es", "en"];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    const fn labels(self) -> &'static [(AdminUnitType, &'static str)] {
        match self {
            Self::Es => ES_LABELS,
            Self::En => EN_LABELS,
        }
    }

    /// Category label for a raw `unit_type`, falling back to the raw value.
    #[must_use]
    pub fn category<'a>(self, unit_type: &'a str) -> &'a str {
        AdminUnitType::parse(unit_type)
            .and_then(|unit| {
                self.labels()
                    .iter()
                    .find(|(candidate, _)| *candidate == unit)
                    .map(|(_, label)| *label)
            })
            .unwrap_or(unit_type)
    }
}

impl FromStr for LabelLanguage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "es" => Ok(Self::Es),
            "en" => Ok(Self::En),
            other => Err(format!("unsupported label language: {other}")),
        }
    }
}

/// Provinces of a country, ordered by name.
/// # Errors
/// Returns [`ApiError`] if the backend query fails.
pub async fn provinces(client: &Client, country_id: &str) -> Result<Vec<DropdownOption>, ApiError> {
    let query = TableQuery::new("administrative_units", "id, name")
        .eq("country_id", country_id)
        .eq("unit_type", AdminUnitType::Province)
        .order("name");

    let rows = client.select(&query).await.map_err(|err| {
        error!("Error fetching provinces for country_id {country_id}: {err}");
        ApiError::from_backend(&err, PROVINCES_FAILED)
    })?;

    Ok(rows.iter().filter_map(plain_option).collect())
}

/// Direct children of `parent_id` restricted to `unit_types`.
///
/// With `local_labels` set, each display name is prefixed with the category
/// label of its unit type (`"Sección - Centro"`).
/// # Errors
/// Returns [`ApiError`] if the remote procedure fails.
pub async fn children(
    client: &Client,
    parent_id: &str,
    unit_types: &[AdminUnitType],
    local_labels: Option<LabelLanguage>,
) -> Result<Vec<DropdownOption>, ApiError> {
    let args = json!({
        "p_parent_id": parent_id,
        "p_child_unit_types": unit_types.iter().map(|unit| unit.as_str()).collect::<Vec<_>>(),
    });

    let data = client.rpc(CHILDREN_RPC, &args).await.map_err(|err| {
        let types = unit_types
            .iter()
            .map(|unit| unit.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        error!("Error fetching children for parent_id {parent_id} with types {types}: {err}");
        ApiError::from_backend(&err, CHILDREN_FAILED)
    })?;

    let rows = match data {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => {
            error!("Unexpected {CHILDREN_RPC} payload: {other}");
            return Err(ApiError::Unexpected(Some(CHILDREN_FAILED.to_string())));
        }
    };

    Ok(format_children(&rows, local_labels))
}

fn format_children(rows: &[Value], local_labels: Option<LabelLanguage>) -> Vec<DropdownOption> {
    match local_labels {
        Some(language) => rows
            .iter()
            .filter_map(|row| local_unit_option(row, language))
            .collect(),
        None => rows.iter().filter_map(plain_option).collect(),
    }
}

fn plain_option(row: &Value) -> Option<DropdownOption> {
    let (Some(id), Some(name)) = (row_id(row), row_str(row, "name")) else {
        warn!("Skipping administrative unit without id or name: {row}");
        return None;
    };

    Some(DropdownOption::new(id, name))
}

fn local_unit_option(row: &Value, language: LabelLanguage) -> Option<DropdownOption> {
    let (Some(id), Some(name)) = (row_id(row), row_str(row, "name")) else {
        warn!("Skipping local unit without id or name: {row}");
        return None;
    };

    let category = row_str(row, "unit_type").map_or("", |unit| language.category(unit));

    Some(DropdownOption::new(id, format!("{category} - {name}")))
}
