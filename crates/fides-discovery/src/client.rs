use std::time::Duration;
use url::Url;

use crate::error::DiscoveryError;
use crate::types::{DiscoveryDocument, IdentityRecord, RegisterIdentityRequest};

/// Deadline for any single outbound registry or well-known fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Typed HTTP client for the identity registry service.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: String,
}

impl RegistryClient {
    /// Create a client for the registry at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, DiscoveryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DiscoveryError::InvalidBaseUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| DiscoveryError::Transport(e.to_string()))?;
        Ok(Self { base_url, http })
    }

    /// The registry this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, DiscoveryError> {
        self.base_url
            .join(path)
            .map_err(|e| DiscoveryError::InvalidBaseUrl(e.to_string()))
    }

    /// `POST /identities`: register a new identity.
    pub async fn register(
        &self,
        request: &RegisterIdentityRequest,
    ) -> Result<IdentityRecord, DiscoveryError> {
        let response = self
            .http
            .post(self.endpoint("identities")?)
            .json(request)
            .send()
            .await?;

        match response.status().as_u16() {
            201 => Ok(response.json().await?),
            409 => Err(DiscoveryError::Duplicate(request.did.clone())),
            status => Err(rejection(status, response).await),
        }
    }

    /// `GET /identities/{did}`: resolve a registered identity.
    pub async fn resolve(&self, did: &str) -> Result<IdentityRecord, DiscoveryError> {
        let response = self
            .http
            .get(self.endpoint(&format!("identities/{did}"))?)
            .send()
            .await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            404 => Err(DiscoveryError::NotFound(did.to_string())),
            status => Err(rejection(status, response).await),
        }
    }

    /// `GET /identities?domain={domain}`: all identities for a domain.
    pub async fn list_by_domain(
        &self,
        domain: &str,
    ) -> Result<Vec<IdentityRecord>, DiscoveryError> {
        let mut url = self.endpoint("identities")?;
        url.query_pairs_mut().append_pair("domain", domain);
        let response = self.http.get(url).send().await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            status => Err(rejection(status, response).await),
        }
    }

    /// Fetch a domain's self-hosted discovery document from
    /// `https://<domain>/.well-known/fides.json`.
    pub async fn fetch_well_known(
        &self,
        domain: &str,
    ) -> Result<DiscoveryDocument, DiscoveryError> {
        let url = well_known_url(domain)?;
        let response = self.http.get(url).send().await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            404 => Err(DiscoveryError::NotFound(domain.to_string())),
            status => Err(rejection(status, response).await),
        }
    }
}

/// Discovery-document URL for a bare domain. A scheme-qualified input is
/// used as-is so tests and private deployments can point at plain HTTP.
pub fn well_known_url(domain: &str) -> Result<Url, DiscoveryError> {
    let base = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };
    let base = Url::parse(&base).map_err(|e| DiscoveryError::InvalidBaseUrl(e.to_string()))?;
    base.join("/.well-known/fides.json")
        .map_err(|e| DiscoveryError::InvalidBaseUrl(e.to_string()))
}

async fn rejection(status: u16, response: reqwest::Response) -> DiscoveryError {
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => format!("status {status}"),
    };
    DiscoveryError::Rejected { status, message }
}
