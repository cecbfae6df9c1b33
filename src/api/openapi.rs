use crate::api::{
    error::ErrorBody,
    handlers::{dropdown, health, terminals},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(health::health, terminals::create_terminal, dropdown::dropdown),
    components(
        schemas(
            health::Health,
            terminals::CreateTerminalRequest,
            terminals::CreateTerminalResponse,
            dropdown::DropdownOption,
            ErrorBody,
        )
    ),
    tags(
        (name = "terminals", description = "Terminal onboarding"),
        (name = "dropdown", description = "Cascading geography options"),
    )
)]
pub(super) struct ApiDoc;
