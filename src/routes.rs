#![forbid(unsafe_code)]

use poem::{Endpoint, EndpointExt, Response, Route};
use poem_openapi::OpenApiService;

use crate::routes::cors::CorsHeaders;
use crate::routes::health::HealthApi;
use crate::routes::hello_world::HelloWorldApi;

pub mod cors;
pub mod health;
pub mod hello_world;

// ---------------------------------------------------------------------------
// service_app:
// ---------------------------------------------------------------------------
/** Assemble the greeting service.  Only the greeting and health routes are
 * published; the generated openapi documents are not served.
 */
pub fn service_app(server_url: &str) -> impl Endpoint<Output = Response> {
    let endpoints = (HelloWorldApi, HealthApi);
    let api_service =
        OpenApiService::new(endpoints, "Hello Server", env!("CARGO_PKG_VERSION")).server(server_url);

    Route::new()
        .nest("/", api_service)
        .with(CorsHeaders)
}
