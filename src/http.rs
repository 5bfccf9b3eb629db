use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Build the shared `reqwest::Client`. `None` means no request timeout.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, AppError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("league-logos/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Send a request and map non-success statuses to [`AppError::Http`].
pub async fn send_checked(req: reqwest::RequestBuilder) -> Result<reqwest::Response, AppError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::Http {
            status: status.as_u16(),
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

/// Send a request, check the status code, and deserialize the JSON response.
pub async fn send_json<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, AppError> {
    Ok(send_checked(req).await?.json().await?)
}
