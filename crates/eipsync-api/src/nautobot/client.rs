// Hand-crafted async HTTP client for the Nautobot IPAM REST API.
//
// Base path: /api/ipam/
// Auth: `Authorization: Token <token>` header

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{
    IpAddressPatch, IpAddressRecord, IpAddressWrite, Page, PrefixPatch, PrefixRecord, PrefixWrite,
};
use crate::Error;
use crate::error::decode_error;

const DEFAULT_PAGE_SIZE: usize = 1000;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Nautobot IPAM endpoints.
///
/// List calls follow `next` until exhausted, stepping `offset` by the
/// page actually received.
#[derive(Debug, Clone)]
pub struct NautobotClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: usize,
}

impl NautobotClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API token and transport config.
    pub fn new(
        base_url: &str,
        token: &SecretString,
        transport: &crate::TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Token {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid API token header value: {e}"),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

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

    /// Accept `https://host`, `https://host/`, or `https://host/api/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let trimmed = raw.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            format!("https://{trimmed}")
        };
        Ok(Url::parse(&format!("{with_scheme}/api/"))?)
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PATCH {url}");

        let resp = self.http.patch(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| decode_error(&e, body))
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: format!("Nautobot refused API token (HTTP {status})"),
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

    /// Collect every page of a list endpoint, with `depth=1` and the
    /// caller's filters applied.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            let mut params: Vec<(&str, String)> = filters.to_vec();
            params.push(("depth", "1".into()));
            params.push(("limit", self.page_size.to_string()));
            params.push(("offset", offset.to_string()));

            let page: Page<T> = self.get_with_params(path, &params).await?;
            let received = page.results.len();
            all.extend(page.results);

            debug!(path, offset, received, total = page.count, "page fetched");
            if page.next.is_none() || received == 0 {
                break;
            }
            offset += received;
        }

        Ok(all)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── IP addresses ─────────────────────────────────────────────────

    pub async fn list_ip_addresses(
        &self,
        filters: &[(&str, String)],
    ) -> Result<Vec<IpAddressRecord>, Error> {
        self.list_all("ipam/ip-addresses/", filters).await
    }

    pub async fn create_ip_address(&self, body: &IpAddressWrite) -> Result<IpAddressRecord, Error> {
        self.post("ipam/ip-addresses/", body).await
    }

    pub async fn update_ip_address(
        &self,
        id: &str,
        body: &IpAddressPatch,
    ) -> Result<IpAddressRecord, Error> {
        self.patch(&format!("ipam/ip-addresses/{id}/"), body).await
    }

    pub async fn delete_ip_address(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("ipam/ip-addresses/{id}/")).await
    }

    // ── Prefixes ─────────────────────────────────────────────────────

    pub async fn list_prefixes(
        &self,
        filters: &[(&str, String)],
    ) -> Result<Vec<PrefixRecord>, Error> {
        self.list_all("ipam/prefixes/", filters).await
    }

    pub async fn create_prefix(&self, body: &PrefixWrite) -> Result<PrefixRecord, Error> {
        self.post("ipam/prefixes/", body).await
    }

    pub async fn update_prefix(&self, id: &str, body: &PrefixPatch) -> Result<PrefixRecord, Error> {
        self.patch(&format!("ipam/prefixes/{id}/"), body).await
    }

    pub async fn delete_prefix(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("ipam/prefixes/{id}/")).await
    }
}
