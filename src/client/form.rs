#![forbid(unsafe_code)]

use anyhow::Result;
use log::debug;

use crate::client::fetch::{Fetch, FetchResponse, GreetingRequest};

// ***************************************************************************
//                               GreetingForm
// ***************************************************************************
/// State behind the greeting form: the name being typed, the last result,
/// the error message and whether a request is in flight.
///
/// A submission moves through `begin_submit` and `settle`; `submit` runs
/// both around one fetch.  Exactly one of result and error is non-empty
/// after a settled submission.
#[derive(Debug, Clone)]
pub struct GreetingForm {
    name: String,
    result: String,
    error: String,
    in_flight: bool,
    failure_message: String,
}

impl GreetingForm {
    pub fn new(failure_message: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            result: String::new(),
            error: String::new(),
            in_flight: false,
            failure_message: failure_message.into(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Submitting is blocked while a request is pending or the name is blank.
    pub fn can_submit(&self) -> bool {
        !self.in_flight && !self.name.trim().is_empty()
    }

    /// Mark the form busy, clear the previous outcome and build the request.
    pub fn begin_submit(&mut self) -> GreetingRequest {
        self.in_flight = true;
        self.result.clear();
        self.error.clear();
        GreetingRequest::new(&self.name)
    }

    /// Record the outcome of the exchange.  Failures of any kind collapse
    /// into the one failure message; the detail only reaches the debug log.
    pub fn settle(&mut self, outcome: Result<FetchResponse>) {
        match outcome {
            Ok(resp) if resp.is_success() => self.result = resp.body,
            Ok(resp) => {
                debug!("Greeting request returned status {}", resp.status);
                self.error = self.failure_message.clone();
            },
            Err(e) => {
                debug!("Greeting request failed: {}", e);
                self.error = self.failure_message.clone();
            },
        }
        self.in_flight = false;
    }

    pub async fn submit<F: Fetch + Sync>(&mut self, fetcher: &F) {
        let req = self.begin_submit();
        let outcome = fetcher.get(&req).await;
        self.settle(outcome);
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::{Result, anyhow};
    use reqwest::Client;

    use super::GreetingForm;
    use crate::client::fetch::{Fetch, FetchResponse, GreetingRequest, HttpFetcher};
    use crate::client::testing::spawn_service;

    const FAILURE: &str = "Failed to connect to the server. Make sure the backend is running on port 8014.";

    // Replays a fixed outcome and records what was asked for.
    struct FakeFetch {
        status: Option<u16>,
        requests: Mutex<Vec<GreetingRequest>>,
    }

    impl FakeFetch {
        fn answering(status: u16) -> Self {
            Self {status: Some(status), requests: Mutex::new(vec![])}
        }

        fn unreachable() -> Self {
            Self {status: None, requests: Mutex::new(vec![])}
        }
    }

    impl Fetch for FakeFetch {
        async fn get(&self, req: &GreetingRequest) -> Result<FetchResponse> {
            self.requests.lock().unwrap().push(req.clone());
            match self.status {
                Some(status) => Ok(FetchResponse {status, body: format!("status {}", status)}),
                None => Err(anyhow!("connection refused")),
            }
        }
    }

    #[test]
    fn submit_disabled_until_name_entered() {
        let mut form = GreetingForm::new(FAILURE);
        assert!(!form.can_submit());

        form.set_name("   ");
        assert!(!form.can_submit());

        form.set_name("A");
        assert!(form.can_submit());

        form.set_name("");
        assert!(!form.can_submit());
    }

    #[test]
    fn begin_submit_clears_outcome_and_blocks_resubmit() {
        let mut form = GreetingForm::new(FAILURE);
        form.set_name("Ada");
        form.settle(Ok(FetchResponse {status: 200, body: "old".to_string()}));
        assert_eq!(form.result(), "old");

        let req = form.begin_submit();
        assert_eq!(req.name.as_deref(), Some("Ada"));
        assert!(form.in_flight());
        assert!(!form.can_submit());
        assert_eq!(form.result(), "");
        assert_eq!(form.error(), "");
    }

    #[tokio::test]
    async fn success_renders_body_verbatim() {
        let fetch = FakeFetch::answering(200);
        let mut form = GreetingForm::new(FAILURE);
        form.set_name(" Ada ");
        form.submit(&fetch).await;

        assert_eq!(form.result(), "status 200");
        assert_eq!(form.error(), "");
        assert!(!form.in_flight());
        assert_eq!(fetch.requests.lock().unwrap()[0].name.as_deref(), Some(" Ada "));
    }

    #[tokio::test]
    async fn non_success_status_shows_failure_message() {
        let fetch = FakeFetch::answering(500);
        let mut form = GreetingForm::new(FAILURE);
        form.set_name("Ada");
        form.submit(&fetch).await;

        assert_eq!(form.error(), FAILURE);
        assert_eq!(form.result(), "");
        assert!(!form.in_flight());
        assert!(form.can_submit());
    }

    #[tokio::test]
    async fn transport_failure_shows_failure_message() {
        let fetch = FakeFetch::unreachable();
        let mut form = GreetingForm::new(FAILURE);
        form.set_name("Ada");
        form.submit(&fetch).await;

        assert_eq!(form.error(), FAILURE);
        assert!(!form.in_flight());
    }

    #[tokio::test]
    async fn empty_name_requests_bare_greeting() {
        let fetch = FakeFetch::answering(200);
        let mut form = GreetingForm::new(FAILURE);
        form.submit(&fetch).await;
        assert_eq!(fetch.requests.lock().unwrap()[0], GreetingRequest {name: None});
    }

    #[tokio::test]
    async fn ada_against_running_service() {
        let base = spawn_service().await;
        let fetcher = HttpFetcher::new(Client::new(), &base).unwrap();
        let mut form = GreetingForm::new(FAILURE);
        form.set_name("Ada");
        form.submit(&fetcher).await;

        assert_eq!(form.result(), "Hello World Ada");
        assert_eq!(form.error(), "");
        assert!(!form.in_flight());
    }
}
