//! `POST /create-terminal`: terminal onboarding through a single remote
//! procedure call made with the caller's credentials.

use axum::{
    Extension, Json,
    body::Bytes,
    http::{HeaderMap, header::AUTHORIZATION},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::{
    api::{AppState, error::ApiError},
    backend,
};

pub const CREATE_TERMINAL_RPC: &str = "admin_create_terminal_onboarding";

const REQUIRED_FIELDS: &str =
    "admin_user_id, terminal_name, and administrative_unit_id are required";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateTerminalRequest {
    #[serde(default)]
    #[schema(value_type = String)]
    pub admin_user_id: Option<Value>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub terminal_name: Option<Value>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub administrative_unit_id: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub street_address: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub postal_code: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub subscription_plan_id: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateTerminalResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub terminal_id: Value,
    pub message: String,
}

/// JavaScript-style truthiness: `null`, `false`, `0` and `""` are falsy.
fn truthy(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

impl CreateTerminalRequest {
    /// Keyword arguments for the creation procedure, or `None` when a required
    /// field is missing or falsy. Falsy optional fields are sent as `null`.
    #[must_use]
    pub fn rpc_args(&self) -> Option<Value> {
        let admin_user_id = truthy(self.admin_user_id.as_ref())?;
        let terminal_name = truthy(self.terminal_name.as_ref())?;
        let administrative_unit_id = truthy(self.administrative_unit_id.as_ref())?;

        let optional =
            |value: &Option<Value>| truthy(value.as_ref()).cloned().unwrap_or(Value::Null);

        Some(json!({
            "p_admin_user_id": admin_user_id,
            "p_terminal_name": terminal_name,
            "p_administrative_unit_id": administrative_unit_id,
            "p_street_address": optional(&self.street_address),
            "p_postal_code": optional(&self.postal_code),
            "p_subscription_plan_id": optional(&self.subscription_plan_id),
        }))
    }
}

#[utoipa::path(
    post,
    path = "/create-terminal",
    request_body = CreateTerminalRequest,
    responses(
        (status = 200, description = "Terminal created", body = CreateTerminalResponse),
        (status = 400, description = "Missing required field", body = crate::api::error::ErrorBody),
        (status = 405, description = "Method not allowed", body = crate::api::error::ErrorBody),
        (status = 500, description = "Creation procedure failed or unreadable body", body = crate::api::error::ErrorBody),
    ),
    tag = "terminals"
)]
/// Create a terminal by calling `admin_create_terminal_onboarding` once.
///
/// The caller's `Authorization` header is forwarded so the procedure runs
/// with the caller's privileges.
#[instrument(skip(state, headers, body))]
pub async fn create_terminal(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CreateTerminalResponse>, ApiError> {
    let args = parse_body(&body)?
        .rpc_args()
        .ok_or_else(|| ApiError::client_input(REQUIRED_FIELDS))?;

    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let client = state.backend.with_authorization(authorization);

    let terminal_id = client
        .rpc(CREATE_TERMINAL_RPC, &args)
        .await
        .map_err(|err| {
            error!("Error creating terminal: {err}");
            match err {
                backend::Error::Api {
                    message: Some(message),
                    ..
                } if !message.is_empty() => ApiError::Backend(message),
                _ => ApiError::Unexpected(None),
            }
        })?;

    info!("Terminal created: {terminal_id}");

    Ok(Json(CreateTerminalResponse {
        success: true,
        terminal_id,
        message: "Terminal created successfully".to_string(),
    }))
}

/// A body that is not JSON, or is `null`, is an unexpected failure. Any other
/// non-object JSON value carries no fields and fails the required check.
fn parse_body(body: &[u8]) -> Result<CreateTerminalRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        error!("Unreadable terminal creation body: {err}");
        ApiError::Unexpected(None)
    })?;

    match value {
        Value::Null => {
            error!("Terminal creation body is null");
            Err(ApiError::Unexpected(None))
        }
        Value::Object(_) => serde_json::from_value(value).map_err(|err| {
            error!("Unreadable terminal creation body: {err}");
            ApiError::Unexpected(None)
        }),
        _ => Ok(CreateTerminalRequest::default()),
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed")
}
