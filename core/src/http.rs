use std::time::Duration;

use crate::error::Result;
use crate::error::WallpickErr;

/// The listing API rejects requests without a user agent.
pub fn user_agent() -> String {
    format!("wallpick/{}", env!("CARGO_PKG_VERSION"))
}

/// Client shared by the catalog, thumbnail and download stages. `timeout`
/// bounds whole requests; the full-resolution download adds its own limit on
/// top since it may legitimately take longer.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(timeout)
        .build()
        .map_err(|err| WallpickErr::Io(std::io::Error::other(err)))
}

/// Formats a reqwest error with its status code when there is one.
pub(crate) fn describe(err: &reqwest::Error) -> String {
    match err.status() {
        Some(status) => format!("HTTP {status}"),
        None if err.is_timeout() => "request timed out".to_string(),
        None if err.is_connect() => "could not connect".to_string(),
        None => err.to_string(),
    }
}
