#![forbid(unsafe_code)]

use anyhow::Result;
use log::info;
use reqwest::Client;

use crate::client::fetch::HttpFetcher;
use crate::client::form::GreetingForm;

pub mod dev_server;
pub mod fetch;
pub mod form;

// ---------------------------------------------------------------------------
// run_greet:
// ---------------------------------------------------------------------------
/** Submit one greeting through the form logic.  The result goes to stdout,
 * the failure message to stderr.  Returns whether the exchange succeeded.
 */
pub async fn run_greet(upstream: &str, failure_message: &str, name: Option<String>) -> Result<bool> {
    let fetcher = HttpFetcher::new(Client::builder().build()?, upstream)?;
    info!("Submitting greeting request to {}", fetcher.base_url());

    let mut form = GreetingForm::new(failure_message);
    form.set_name(name.unwrap_or_default());
    form.submit(&fetcher).await;

    if form.error().is_empty() {
        println!("{}", form.result());
        Ok(true)
    } else {
        eprintln!("{}", form.error());
        Ok(false)
    }
}

// ***************************************************************************
//                              Test Support
// ***************************************************************************
#[cfg(test)]
pub(crate) mod testing {
    use poem::listener::{Acceptor, Listener, TcpListener};
    use poem::Server;

    use crate::routes::service_app;

    /// Run the greeting service on an ephemeral port and return its base url.
    pub async fn spawn_service() -> String {
        let acceptor = TcpListener::bind("127.0.0.1:0").into_acceptor().await.unwrap();
        let addr = *acceptor.local_addr()[0].0.as_socket_addr().unwrap();
        let base = format!("http://{}", addr);
        let app = service_app(&base);
        tokio::spawn(async move {
            let _ = Server::new_with_acceptor(acceptor).run(app).await;
        });
        base
    }
}

#[cfg(test)]
mod tests {
    use super::run_greet;
    use crate::client::testing::spawn_service;

    const FAILURE: &str = "Failed to connect to the server. Make sure the backend is running on port 8014.";

    #[tokio::test]
    async fn greet_succeeds_against_service() {
        let base = spawn_service().await;
        assert!(run_greet(&base, FAILURE, Some("Ada".to_string())).await.unwrap());
        assert!(run_greet(&base, FAILURE, None).await.unwrap());
    }

    #[tokio::test]
    async fn greet_fails_without_service() {
        assert!(!run_greet("http://127.0.0.1:1", FAILURE, Some("Ada".to_string())).await.unwrap());
    }
}
