#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use log::{debug, error};
use poem::http::header::{self, HeaderName};
use poem::http::StatusCode;
use poem::web::{Data, Html, Query};
use poem::{get, handler, Body, Endpoint, EndpointExt, Request, Response, Route};
use reqwest::Client;
use serde::Deserialize;
use tera::{Context, Tera};

use crate::client::fetch::HttpFetcher;
use crate::client::form::GreetingForm;
use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// The .html suffix turns on tera's autoescaping for the page.
const INDEX_TEMPLATE_NAME: &str = "index.html";
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

// ***************************************************************************
//                                DevServer
// ***************************************************************************
/// Shared state of the client development server.  Forms are not shared;
/// every page request builds its own.
pub struct DevServer {
    title: String,
    upstream: String,
    client: Client,
    fetcher: HttpFetcher,
    failure_message: String,
    templates: Tera,
}

impl DevServer {
    pub fn new(title: &str, upstream: &str, failure_message: &str) -> Result<Self> {
        let client = Client::builder().build()?;
        let fetcher = HttpFetcher::new(client.clone(), upstream)?;

        let mut templates = Tera::default();
        templates.add_raw_template(INDEX_TEMPLATE_NAME, INDEX_TEMPLATE)
            .map_err(|e| anyhow!(Errors::TemplateError(INDEX_TEMPLATE_NAME.to_string(), e.to_string())))?;

        Ok(Self {
            title: title.to_string(),
            upstream: upstream.trim_end_matches('/').to_string(),
            client,
            fetcher,
            failure_message: failure_message.to_string(),
            templates,
        })
    }

    fn render_page(&self, form: &GreetingForm) -> Result<String> {
        let mut ctx = Context::new();
        ctx.insert("title", &self.title);
        ctx.insert("name", form.name());
        ctx.insert("result", form.result());
        ctx.insert("error", form.error());
        ctx.insert("in_flight", &form.in_flight());
        ctx.insert("submit_disabled", &!form.can_submit());

        self.templates.render(INDEX_TEMPLATE_NAME, &ctx)
            .map_err(|e| anyhow!(Errors::TemplateError(INDEX_TEMPLATE_NAME.to_string(), e.to_string())))
    }
}

// ---------------------------------------------------------------------------
// dev_server_app:
// ---------------------------------------------------------------------------
/// The form page at the root and a pass-through proxy for every path under
/// /hello, the bare /hello included.
pub fn dev_server_app(server: DevServer) -> impl Endpoint<Output = Response> {
    Route::new()
        .at("/", get(index))
        .at("/hello", proxy)
        .at("/hello/*path", proxy)
        .data(Arc::new(server))
}

// ***************************************************************************
//                                 Handlers
// ***************************************************************************
#[derive(Debug, Deserialize)]
struct IndexParams {
    name: Option<String>,
}

// A name parameter means the form was submitted.
#[handler]
async fn index(Query(params): Query<IndexParams>, Data(server): Data<&Arc<DevServer>>)
-> poem::Result<Html<String>> {
    let mut form = GreetingForm::new(server.failure_message.as_str());
    if let Some(name) = params.name {
        form.set_name(name);
        form.submit(&server.fetcher).await;
    }

    match server.render_page(&form) {
        Ok(page) => Ok(Html(page)),
        Err(e) => {
            error!("{}", e);
            Err(poem::Error::from_string(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

#[handler]
async fn proxy(req: &Request, body: Body, Data(server): Data<&Arc<DevServer>>) -> Response {
    let path_and_query = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target = format!("{}{}", server.upstream, path_and_query);
    debug!("Proxying {} {} to {}", req.method(), req.uri(), target);

    match forward(&server.client, req, body, &target).await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Proxy request to {} failed: {}", target, e);
            Response::builder()
                .status(StatusCode::BAD_GATEWAY)
                .body(format!("Unable to reach {}", server.upstream))
        }
    }
}

// ***************************************************************************
//                            Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// forward:
// ---------------------------------------------------------------------------
/** Replay the request against the upstream and copy back the status,
 * headers and body.  The Host header is dropped so that reqwest sets the
 * upstream's own.
 */
async fn forward(client: &Client, req: &Request, body: Body, target: &str) -> Result<Response> {
    let mut headers = req.headers().clone();
    for h in [header::HOST, header::CONNECTION, header::CONTENT_LENGTH, header::TRANSFER_ENCODING] {
        headers.remove(h);
    }
    let body = body.into_vec().await?;

    let upstream = client.request(req.method().clone(), target)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let mut builder = Response::builder().status(upstream.status());
    for (k, v) in upstream.headers().iter() {
        if !is_hop_header(k) {
            builder = builder.header(k.clone(), v.clone());
        }
    }
    let bytes = upstream.bytes().await?;
    Ok(builder.body(bytes.to_vec()))
}

// Connection-level headers the proxy never copies between hops.
fn is_hop_header(name: &HeaderName) -> bool {
    name == header::HOST
        || name == header::CONNECTION
        || name == header::CONTENT_LENGTH
        || name == header::TRANSFER_ENCODING
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use poem::http::StatusCode;
    use poem::test::{TestClient, TestResponse};

    use super::{dev_server_app, DevServer};
    use crate::client::testing::spawn_service;

    const FAILURE: &str = "Failed to connect to the server. Make sure the backend is running on port 8014.";

    async fn body_of(resp: TestResponse) -> String {
        resp.0.into_body().into_string().await.unwrap()
    }

    fn client_for(upstream: &str) -> TestClient<impl poem::Endpoint> {
        TestClient::new(dev_server_app(DevServer::new("Hello", upstream, FAILURE).unwrap()))
    }

    #[tokio::test]
    async fn empty_form_has_disabled_submit() {
        let cli = client_for("http://127.0.0.1:1");
        let resp = cli.get("/").send().await;
        resp.assert_status_is_ok();
        let page = body_of(resp).await;
        assert!(page.contains("<button id=\"submit\" type=\"submit\" disabled>Submit</button>"));
        assert!(!page.contains("class=\"result\""));
        assert!(!page.contains("class=\"error\""));
    }

    #[tokio::test]
    async fn submitted_form_renders_greeting() {
        let base = spawn_service().await;
        let cli = client_for(&base);
        let resp = cli.get("/?name=Ada").send().await;
        resp.assert_status_is_ok();
        let page = body_of(resp).await;
        assert!(page.contains("<p>Hello World Ada</p>"));
        assert!(page.contains("value=\"Ada\""));
        assert!(page.contains("<button id=\"submit\" type=\"submit\">Submit</button>"));
    }

    #[tokio::test]
    async fn greeting_is_escaped_in_page() {
        let base = spawn_service().await;
        let cli = client_for(&base);
        let page = body_of(cli.get("/?name=%3Cb%3E").send().await).await;
        assert!(page.contains("<p>Hello World &lt;b&gt;</p>"));
        assert!(!page.contains("<b>"));
    }

    #[tokio::test]
    async fn unreachable_upstream_renders_failure() {
        let cli = client_for("http://127.0.0.1:1");
        let resp = cli.get("/?name=Ada").send().await;
        resp.assert_status_is_ok();
        let page = body_of(resp).await;
        assert!(page.contains(FAILURE));
        assert!(!page.contains("class=\"result\""));
    }

    #[tokio::test]
    async fn proxy_forwards_to_service() {
        let base = spawn_service().await;
        let cli = client_for(&base);

        let resp = cli.get("/hello/world?name=Ada").send().await;
        resp.assert_status_is_ok();
        resp.assert_header("Access-Control-Allow-Origin", "*");
        resp.assert_text("Hello World Ada").await;

        let resp = cli.get("/hello/moon").send().await;
        resp.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn proxy_forwards_bare_hello() {
        let base = spawn_service().await;
        let cli = client_for(&base);

        // The service's own 404 carries its CORS headers; a local 404 would not.
        let resp = cli.get("/hello").send().await;
        resp.assert_status(StatusCode::NOT_FOUND);
        resp.assert_header("Access-Control-Allow-Origin", "*");
    }

    #[tokio::test]
    async fn proxy_reports_bad_gateway() {
        let cli = client_for("http://127.0.0.1:1");
        let resp = cli.get("/hello/world").send().await;
        resp.assert_status(StatusCode::BAD_GATEWAY);
    }
}
