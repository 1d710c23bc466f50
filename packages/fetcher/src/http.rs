//! Single-shot HTTP JSON helper.
//!
//! Polling retries on its own schedule, so a request here is sent exactly
//! once. On a body that is not valid JSON the response metadata and a body
//! preview are logged before the error is returned.

use crate::FetchError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends a GET request and parses the body as JSON.
///
/// # Errors
///
/// Returns [`FetchError`] on transport failure, a non-success status, or a
/// body that is not JSON.
pub async fn get_json(client: &reqwest::Client, url: &str) -> Result<serde_json::Value, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             content-type: {content_type:?}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {}",
            text.len(),
            preview(&text),
        );
        FetchError::Json(e)
    })
}

/// Truncates `text` to [`BODY_PREVIEW_LEN`] bytes on a char boundary.
fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
