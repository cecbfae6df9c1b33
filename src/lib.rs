//! # Onboard
//!
//! `onboard` is a small HTTP service in front of a PostgREST-compatible backend.
//! It exposes two endpoints:
//!
//! - `POST /create-terminal`: validates a terminal onboarding request and submits it
//!   as a single call to the `admin_create_terminal_onboarding` remote procedure,
//!   forwarding the caller's bearer token.
//! - `GET /get-dropdown-data`: resolves one level of the administrative geography
//!   cascade (country → province → municipality → district → local unit) and
//!   returns it as `[{id, display_name}]`.
//!
//! The service holds no state of its own. Every request is validated, translated
//! into one or more backend calls, and reshaped into JSON.

pub mod api;
pub mod backend;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
