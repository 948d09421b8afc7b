#![forbid(unsafe_code)]

use std::future::Future;

use anyhow::{Result, anyhow};
use log::debug;
use reqwest::{Client, Url};

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const HELLO_WORLD_PATH: &str = "/hello/world";
const NAME_PARAM: &str = "name";

// ***************************************************************************
//                             Request/Response
// ***************************************************************************
// ---------------------------------------------------------------------------
// GreetingRequest:
// ---------------------------------------------------------------------------
/// One greeting exchange.  An empty name means the bare path is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingRequest {
    pub name: Option<String>,
}

impl GreetingRequest {
    pub fn new(name: &str) -> Self {
        let name = if name.is_empty() {None} else {Some(name.to_string())};
        Self {name}
    }
}

// ---------------------------------------------------------------------------
// FetchResponse:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
/// Transport used by the greeting form.  Any status is returned as a
/// response; only transport failures are errors.
pub trait Fetch {
    fn get(&self, req: &GreetingRequest) -> impl Future<Output = Result<FetchResponse>> + Send;
}

// ***************************************************************************
//                               HttpFetcher
// ***************************************************************************
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
}

impl HttpFetcher {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow!(Errors::HelloError(format!("invalid base url {}: {}", base_url, e))))?;
        Ok(Self {client, base_url})
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of the greeting request with the name form-encoded.
    pub fn url_for(&self, req: &GreetingRequest) -> Result<Url> {
        let mut url = self.base_url.join(HELLO_WORLD_PATH)?;
        if let Some(name) = &req.name {
            url.query_pairs_mut().append_pair(NAME_PARAM, name);
        }
        Ok(url)
    }
}

impl Fetch for HttpFetcher {
    async fn get(&self, req: &GreetingRequest) -> Result<FetchResponse> {
        let url = self.url_for(req)?;
        debug!("Requesting greeting from {}", url);

        let resp = self.client.get(url).send().await
            .map_err(|e| anyhow!(Errors::RequestFailed(e.to_string())))?;
        let status = resp.status().as_u16();
        let body = resp.text().await
            .map_err(|e| anyhow!(Errors::RequestFailed(e.to_string())))?;
        Ok(FetchResponse {status, body})
    }
}
