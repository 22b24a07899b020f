//! URL helpers for talking to the relay.

/// Join a base URL and an endpoint path without doubling slashes, however
/// the base was written in configuration.
pub fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
