#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{ OpenApi, param::Query, payload::PlainText };

use crate::utils::hello_utils::{self, RequestDebug};

// ***************************************************************************
//                                Constants
// ***************************************************************************
const GREETING: &str = "Hello World";

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct HelloWorldApi;

struct ReqHelloWorld
{
    name: Option<String>,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqHelloWorld {
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(64);
        s.push_str("  Request parameters:");
        s.push_str("\n    name: ");
        match &self.name {
            Some(n) => s.push_str(n),
            None => s.push_str("<none>"),
        }
        s
    }
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl HelloWorldApi {
    /// Greet the caller, by name when one is given.
    #[oai(path = "/hello/world", method = "get")]
    async fn get_hello_world(&self, http_req: &Request, name: Query<Option<String>>) -> PlainText<String> {
        let req = ReqHelloWorld {name: name.0};
        hello_utils::debug_request(http_req, &req);
        PlainText(greeting(req.name.as_deref()))
    }
}

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// greeting:
// ---------------------------------------------------------------------------
/** The name is appended verbatim: no trimming and no escaping.  An empty
 * name is treated the same as no name.
 */
pub fn greeting(name: Option<&str>) -> String {
    match name {
        Some(n) if !n.is_empty() => format!("{} {}", GREETING, n),
        _ => GREETING.to_string(),
    }
}
