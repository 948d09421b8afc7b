#![forbid(unsafe_code)]

use poem::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW,
};
use poem::http::{Method, StatusCode};
use poem::{Endpoint, Middleware, Request, Response, Result};

// ***************************************************************************
//                                Constants
// ***************************************************************************
const ALLOW_ORIGIN : &str = "*";
const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE";
const ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";
const ROUTE_METHODS: &str = "GET, HEAD";

// ***************************************************************************
//                                Middleware
// ***************************************************************************
/// Stamps the permissive cross-origin headers on every response.
///
/// Unlike poem's `Cors` middleware this does not look at the `Origin`
/// header; the headers are set unconditionally, including on 404 and 405
/// responses produced by the router.  An OPTIONS request to an existing
/// route gets an empty 200 so that browser preflights succeed; unknown
/// paths still get the router's 404.
pub struct CorsHeaders;

impl<E: Endpoint> Middleware<E> for CorsHeaders {
    type Output = CorsHeadersEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        CorsHeadersEndpoint { inner: ep }
    }
}

pub struct CorsHeadersEndpoint<E> {
    inner: E,
}

impl<E: Endpoint> Endpoint for CorsHeadersEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> Result<Self::Output> {
        let preflight = *req.method() == Method::OPTIONS;

        // Errors are converted to responses here so they get the headers too.
        let mut resp = self.inner.get_response(req).await;
        if preflight && resp.status() == StatusCode::METHOD_NOT_ALLOWED {
            resp = Response::builder()
                .status(StatusCode::OK)
                .header(ALLOW, ROUTE_METHODS)
                .finish();
        }
        let headers = resp.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
        Ok(resp)
    }
}
