//! Browser-like header sets sent to the portal.

use crate::error::{ClientError, Result};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER,
};

/// Accept header used for JSON API calls.
pub const ACCEPT_JSON: &str = "application/json, text/plain, */*";

/// Accept header used when fetching HTML pages.
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Vendor header carrying the anti-forgery token.
pub static CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

/// Vendor header carrying the per-session correlation identifier.
pub static CORRELATION_ID: HeaderName = HeaderName::from_static("correlationid");

/// Marker header identifying an ajax request.
pub static REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Headers for fetching the bootstrap page, as a browser navigating to it would.
#[must_use]
pub fn page_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers
}

/// Headers for the geocoding endpoint, as the portal's own front end sends them.
///
/// # Errors
/// Returns `ClientError::InvalidHeader` if the referer is not a valid header value.
pub fn geocode_headers(referer: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(REFERER, header_value("referer", referer)?);
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    Ok(headers)
}

/// Headers attached to every request of an authenticated session.
///
/// The token value is marked sensitive so it is redacted from debug output.
///
/// # Errors
/// Returns `ClientError::InvalidHeader` if the token or correlation id cannot be encoded.
pub fn session_headers(csrf_token: &str, correlation_id: &str) -> Result<HeaderMap> {
    let mut headers = page_headers();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
    headers.insert(
        REQUESTED_WITH.clone(),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    let mut token = header_value(CSRF_TOKEN.as_str(), csrf_token)?;
    token.set_sensitive(true);
    headers.insert(CSRF_TOKEN.clone(), token);
    headers.insert(
        CORRELATION_ID.clone(),
        header_value(CORRELATION_ID.as_str(), correlation_id)?,
    );

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
