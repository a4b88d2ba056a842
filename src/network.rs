use crate::options::Cli;
use base64::Engine;
use reqwest::StatusCode;
use std::error::Error;
use std::time::Duration;
use url::Url;

/// One fetched page, with the metadata the crawler and the graph builder
/// care about. `body` is empty when the request failed on the transport
/// level; `is_html` gates link extraction.
#[derive(Debug)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub response_time: Duration,
    pub size: usize,
    pub body: String,
    pub is_html: bool,
}

/// Builds and configures the HTTP client based on the provided CLI options.
///
/// # Arguments
///
/// * `options` - A reference to the CLI options containing client configuration settings.
///
/// # Returns
///
/// A `Result` containing the built `Client` if successful, or an error otherwise.
pub fn build_client(options: &Cli) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client_builder = reqwest::Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(Duration::from_secs(options.request_timeout as u64));

    if options.follow_redirects {
        client_builder = client_builder.redirect(reqwest::redirect::Policy::limited(10));
    }

    if let Some(auth) = &options.basic_auth {
        if !auth.is_empty() {
            let mut headers = reqwest::header::HeaderMap::new();
            let encoded_credentials =
                base64::engine::general_purpose::STANDARD.encode(auth.as_bytes());
            let auth_value = format!("Basic {}", encoded_credentials).parse()?;
            headers.insert(reqwest::header::AUTHORIZATION, auth_value);
            client_builder = client_builder.default_headers(headers);
        }
    }
    Ok(client_builder.build()?)
}

/// Fetches a single page and captures its status, timing, size and body.
///
/// Transport-level failures are folded into synthetic status codes instead
/// of aborting the crawl: a timeout becomes 408, a connection failure 502,
/// a malformed request 400. Anything else is propagated as an error.
pub async fn fetch_page(
    url: &Url,
    client: &reqwest::Client,
) -> Result<FetchedPage, reqwest::Error> {
    let start_time = tokio::time::Instant::now();
    let response = client.get(url.clone()).send().await;

    let (status, is_html, body) = match response {
        Ok(resp) => {
            let status = resp.status();
            let is_html = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.contains("text/html"))
                .unwrap_or(false);
            let body = resp.text().await.unwrap_or_default();
            (status, is_html, body)
        }
        Err(e) if e.is_timeout() => (StatusCode::REQUEST_TIMEOUT, false, String::new()),
        Err(e) if e.is_connect() => (StatusCode::BAD_GATEWAY, false, String::new()),
        Err(e) if e.is_request() => (StatusCode::BAD_REQUEST, false, String::new()),
        Err(e) => return Err(e),
    };

    Ok(FetchedPage {
        status,
        response_time: start_time.elapsed(),
        size: body.len(),
        body,
        is_html,
    })
}
