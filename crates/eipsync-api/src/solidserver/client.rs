// Hand-crafted async HTTP client for the EfficientIP SOLIDserver REST API.
//
// Base path: /rest/{service}
// Auth: X-IPM-Username / X-IPM-Password headers, each base64-encoded

use std::future::Future;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::Service;
use super::models::{CountRecord, OneOrMany};
use crate::Error;
use crate::error::decode_error;

/// Page size used when walking list services.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the SOLIDserver REST API.
///
/// Read-only: the sync job never writes back to SOLIDserver. Every list
/// service is paged with `limit`/`offset`; a short page ends the walk.
#[derive(Debug, Clone)]
pub struct SolidServerClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: usize,
}

impl SolidServerClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from credentials and transport config.
    ///
    /// Injects the base64-encoded `X-IPM-*` headers on every request.
    pub fn new(
        base_url: &str,
        username: &str,
        password: &SecretString,
        transport: &crate::TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert("X-IPM-Username", encoded_header(username)?);
        headers.insert(
            "X-IPM-Password",
            encoded_header(password.expose_secret())?,
        );

        let http = transport.build_client_with_headers(headers)?;
        Self::with_client(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Prepend `https://` when no scheme is given and ensure a trailing `/`
    /// so that `rest/...` joins underneath any path prefix.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let trimmed = raw.trim().trim_end_matches('/');
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            format!("https://{trimmed}")
        };
        Ok(Url::parse(&format!("{with_scheme}/"))?)
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, service: Service) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("rest/{service}"))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    /// `GET /rest/{service}` and decode the body as a list of `T`.
    ///
    /// 204 and blank bodies are an empty result, not an error.
    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        service: Service,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let url = self.url(service)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<Vec<T>, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(self.parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<OneOrMany<T>>(&body)
            .map(OneOrMany::into_vec)
            .map_err(|e| decode_error(&e, body))
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: format!("SOLIDserver refused credentials (HTTP {status})"),
            };
        }

        Error::Upstream {
            status: status.as_u16(),
            body: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
        }
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Collect all pages into a single `Vec<T>`.
    ///
    /// `fetch` receives `(offset, limit)`; a page shorter than `limit`
    /// ends the walk.
    pub async fn paginate_all<T, F, Fut>(&self, fetch: F) -> Result<Vec<T>, Error>
    where
        F: Fn(usize, usize) -> Fut,
        Fut: Future<Output = Result<Vec<T>, Error>>,
    {
        let limit = self.page_size;
        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            let page = fetch(offset, limit).await?;
            let received = page.len();
            all.extend(page);

            debug!(offset, received, total = all.len(), "page fetched");
            if received < limit {
                break;
            }
            offset += received;
        }

        Ok(all)
    }

    /// Walk every page of `service`, applying an optional `WHERE` clause.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        service: Service,
        where_clause: Option<&str>,
    ) -> Result<Vec<T>, Error> {
        self.paginate_all(|offset, limit| async move {
            let mut params = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
            if let Some(clause) = where_clause {
                params.push(("WHERE", clause.to_owned()));
            }
            self.get_list(service, &params).await
        })
        .await
    }

    /// Read a `*_count` service; the server answers `[{"total": "N"}]`.
    pub async fn count(&self, service: Service) -> Result<u64, Error> {
        let rows: Vec<CountRecord> = self.get_list(service, &[]).await?;
        let total = rows
            .first()
            .and_then(|r| r.total.as_deref())
            .unwrap_or("0");
        total.trim().parse().map_err(|_| Error::Deserialization {
            message: format!("count service {service} returned non-numeric total {total:?}"),
            body: total.to_owned(),
        })
    }
}

fn encoded_header(value: &str) -> Result<HeaderValue, Error> {
    let mut header =
        HeaderValue::from_str(&STANDARD.encode(value)).map_err(|e| Error::Authentication {
            message: format!("invalid credential header value: {e}"),
        })?;
    header.set_sensitive(true);
    Ok(header)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_prepended_when_missing() {
        let url = SolidServerClient::normalize_base_url("ipam.example.net/").unwrap();
        assert_eq!(url.as_str(), "https://ipam.example.net/");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let url = SolidServerClient::normalize_base_url("http://10.0.0.5:8080").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8080/");
    }

    #[test]
    fn service_url_joins_under_rest() {
        let client =
            SolidServerClient::with_client("https://ipam.example.net", reqwest::Client::new())
                .unwrap();
        let url = client.url(Service::SubnetList).unwrap();
        assert_eq!(url.as_str(), "https://ipam.example.net/rest/ip_block_subnet_list");
    }

    #[test]
    fn page_size_never_zero() {
        let client = SolidServerClient::with_client("ipam.example.net", reqwest::Client::new())
            .unwrap()
            .with_page_size(0);
        assert_eq!(client.page_size(), 1);
    }

    #[test]
    fn credentials_are_base64_encoded() {
        let header = encoded_header("admin").unwrap();
        assert_eq!(header.to_str().unwrap(), "YWRtaW4=");
        assert!(header.is_sensitive());
    }
}
