#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, Object };

use crate::utils::hello_utils::{self, RequestDebug};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct HealthApi;

struct ReqHealth;

#[derive(Object, Debug)]
pub struct RespHealth
{
    status: String,
}

impl RequestDebug for ReqHealth {
    fn get_request_info(&self) -> String {
        "  Request parameters: none".to_string()
    }
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl HealthApi {
    #[oai(path = "/health", method = "get")]
    async fn get_health(&self, http_req: &Request) -> Json<RespHealth> {
        hello_utils::debug_request(http_req, &ReqHealth);
        Json(RespHealth::new("success"))
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespHealth {
    fn new(status: &str) -> Self {
        Self {status: status.to_string()}
    }
}
