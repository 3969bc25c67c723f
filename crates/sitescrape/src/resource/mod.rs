// ABOUTME: Resource handling module for fetching pages and turning them into parsed documents.
// ABOUTME: Handles HTTP fetching with timeouts, content-length limits, charset decoding and HTML parsing.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use scraper::Html;

use crate::error::ScrapeError;
use crate::options::Options;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Builds an in-memory 200 response, used for offline pages and stub fetchers.
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            status: 200,
            final_url: url.clone(),
            url,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: Bytes::from(html.into()),
        }
    }

    /// Decode the body as text, using charset hints from the content-type header.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Source of raw page bodies.
///
/// The aggregator only talks to this trait, so tests and embedders can swap
/// the network out for canned responses.
pub trait Fetcher {
    /// Fetches a page, rejecting any final status outside 2xx.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResult, ScrapeError>> + Send;

    /// Fetches a page whatever its status; only transport failures are errors.
    fn fetch_any_status(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<FetchResult, ScrapeError>> + Send {
        self.fetch(url)
    }
}

/// Per-request fetch settings.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions<'a> {
    pub headers: &'a HashMap<String, String>,
    /// Return error pages (4xx/5xx) as results instead of failing.
    pub parse_non_200: bool,
}

/// Fetches pages over HTTP(S) with reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    headers: HashMap<String, String>,
}

impl HttpFetcher {
    /// Builds the HTTP client described by `opts`.
    ///
    /// A caller-supplied `http_client` is used as-is; the configured headers
    /// are still attached to every request.
    pub fn new(opts: &Options) -> Result<Self, ScrapeError> {
        let client = match &opts.http_client {
            Some(client) => client.clone(),
            None => reqwest::Client::builder()
                .user_agent(opts.user_agent.clone())
                .timeout(opts.timeout)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .map_err(|e| {
                    ScrapeError::config(
                        "BuildClient",
                        Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
                    )
                })?,
        };
        for (key, value) in &opts.headers {
            validate_header(key, value)?;
        }
        Ok(Self {
            client,
            headers: opts.headers.clone(),
        })
    }

    fn fetch_options(&self, parse_non_200: bool) -> FetchOptions<'_> {
        FetchOptions {
            headers: &self.headers,
            parse_non_200,
        }
    }
}

fn validate_header(key: &str, value: &str) -> Result<(), ScrapeError> {
    reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
        ScrapeError::config(
            "BuildClient",
            Some(anyhow::anyhow!("invalid header name {:?}: {}", key, e)),
        )
    })?;
    reqwest::header::HeaderValue::from_str(value).map_err(|e| {
        ScrapeError::config(
            "BuildClient",
            Some(anyhow::anyhow!("invalid value for header {}: {}", key, e)),
        )
    })?;
    Ok(())
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, ScrapeError> {
        fetch(&self.client, url, self.fetch_options(false)).await
    }

    async fn fetch_any_status(&self, url: &str) -> Result<FetchResult, ScrapeError> {
        fetch(&self.client, url, self.fetch_options(true)).await
    }
}

/// Checks that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<url::Url, ScrapeError> {
    if url.is_empty() {
        return Err(ScrapeError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("empty URL")),
        ));
    }

    let parsed = url::Url::parse(url).map_err(|e| {
        ScrapeError::invalid_url(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ScrapeError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }
    Ok(parsed)
}

/// Decode body bytes to a String using charset from content-type header or detection.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Fetch a resource from the given URL.
///
/// Redirects are followed. Unless `opts.parse_non_200` is set, any final
/// status outside 2xx is a fetch error.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: FetchOptions<'_>,
) -> Result<FetchResult, ScrapeError> {
    validate_url(url)?;

    let mut request = client.get(url);
    for (key, value) in opts.headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| request_error(url, e))?;

    let content_length = response.content_length().or_else(|| {
        response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
    });
    if let Some(len) = content_length {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ScrapeError::fetch(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let status = response.status().as_u16();
    if !opts.parse_non_200 && !(200..300).contains(&status) {
        return Err(ScrapeError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {}", status)),
        ));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response.bytes().await.map_err(|e| request_error(url, e))?;
    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ScrapeError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        status,
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}

fn request_error(url: &str, e: reqwest::Error) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::timeout(url, "Fetch", Some(anyhow::anyhow!("request timed out: {}", e)))
    } else {
        ScrapeError::fetch(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
    }
}

/// Parses a fetched body into a document tree.
///
/// HTML parsing is lenient, so the only unparseable input is a body that
/// decodes to nothing but whitespace.
pub fn parse_document(result: &FetchResult) -> Result<Html, ScrapeError> {
    parse_html(&result.text(), &result.url)
}

/// Parses already-decoded markup into a document tree.
pub fn parse_html(html: &str, url: &str) -> Result<Html, ScrapeError> {
    if html.trim().is_empty() {
        return Err(ScrapeError::parse(
            url,
            "ParseDocument",
            Some(anyhow::anyhow!("empty document")),
        ));
    }
    Ok(Html::parse_document(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn test_fetcher() -> HttpFetcher {
        HttpFetcher::new(&Options::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/test");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<p>hello</p>");
        });

        let result = test_fetcher().fetch(&server.url("/test")).await;
        mock.assert();

        let result = result.expect("fetch should succeed");
        assert_eq!(result.status, 200);
        assert_eq!(result.text(), "<p>hello</p>");
        assert_eq!(
            result.content_type.as_deref(),
            Some("text/html; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/headers")
                .header("accept-language", "en-US,en;q=0.5")
                .header_exists("user-agent");
            then.status(200).body("<p>ok</p>");
        });

        let result = test_fetcher().fetch(&server.url("/headers")).await;
        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_404_rejected() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/notfound");
            then.status(404).body("not found");
        });

        let result = test_fetcher().fetch(&server.url("/notfound")).await;
        mock.assert();

        let err = result.expect_err("should fail on 404");
        assert!(err.is_fetch());
        assert!(err.to_string().contains("HTTP status 404"));
    }

    #[tokio::test]
    async fn test_fetch_any_status_returns_error_page() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/notfound");
            then.status(404)
                .header("content-type", "text/html")
                .body("<title>Not Found</title>");
        });

        let result = test_fetcher()
            .fetch_any_status(&server.url("/notfound"))
            .await
            .expect("error pages are returned");
        assert_eq!(result.status, 404);
        assert_eq!(result.text(), "<title>Not Found</title>");
    }

    #[tokio::test]
    async fn test_fetch_any_status_still_rejects_bad_urls() {
        let err = test_fetcher()
            .fetch_any_status("ftp://example.com/")
            .await
            .expect_err("should reject");
        assert!(err.is_invalid_url());
    }

    #[tokio::test]
    async fn test_fetch_500_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/boom");
            then.status(500);
        });

        let err = test_fetcher()
            .fetch(&server.url("/boom"))
            .await
            .expect_err("should fail on 500");
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_millis(800))
                .body("<p>late</p>");
        });

        let opts = Options {
            timeout: Duration::from_millis(100),
            ..Options::default()
        };
        let fetcher = HttpFetcher::new(&opts).unwrap();
        let err = fetcher
            .fetch(&server.url("/slow"))
            .await
            .expect_err("should time out");
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_urls() {
        let fetcher = test_fetcher();
        for url in ["", "not a url", "ftp://example.com/file"] {
            let err = fetcher.fetch(url).await.expect_err("should reject");
            assert!(err.is_invalid_url(), "url {:?}", url);
        }
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut opts = Options::default();
        opts.headers.insert("Bad Header".to_string(), "x".to_string());
        let err = HttpFetcher::new(&opts).expect_err("should reject header");
        assert!(err.is_config());
    }

    #[test]
    fn test_max_content_length_constant() {
        assert_eq!(MAX_CONTENT_LENGTH, 10 * 1024 * 1024);
    }

    #[test]
    fn test_decode_iso_8859_1_with_chardetng() {
        let iso_bytes: &[u8] = &[0x63, 0x61, 0x66, 0xe9];
        let decoded = decode_body(iso_bytes, None);
        assert_eq!(decoded, "café");
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(
            extract_charset("text/html; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(
            extract_charset("text/html; charset=ISO-8859-1"),
            Some("iso-8859-1".to_string())
        );
        assert_eq!(
            extract_charset("text/html; charset=\"utf-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn test_parse_empty_document_fails() {
        let result = FetchResult::from_html("https://example.com/", "  \n\t ");
        let err = parse_document(&result).expect_err("empty body should fail");
        assert!(err.is_parse());
    }

    #[test]
    fn test_parse_malformed_markup_succeeds() {
        let result = FetchResult::from_html("https://example.com/", "<div><p>unclosed");
        let doc = parse_document(&result).expect("lenient parse");
        let p = scraper::Selector::parse("p").unwrap();
        assert_eq!(doc.select(&p).count(), 1);
    }
}
