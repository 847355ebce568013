use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = "CraftSync/0.1.0";

/// Timeout for small metadata calls (version endpoints).
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for version-check API calls. Bounded total timeout.
pub fn build_api_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .timeout(API_TIMEOUT)
        .build()
}

/// Client for archive/binary downloads. No total timeout — large files are
/// progress-driven and cancelled through a token instead; only connecting
/// is bounded.
pub fn build_download_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .connect_timeout(API_TIMEOUT)
        .build()
}
