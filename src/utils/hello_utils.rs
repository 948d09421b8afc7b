#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::Path;

use poem::Request;

use log::{debug, LevelFilter};

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  Unlike canonicalize, absolutize
 * does not care whether the file exists.
 *
 * On any expansion or conversion failure the original path is returned.
 */
pub fn get_absolute_path(path: &str) -> String {
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    match p1.to_str() {
        Some(x) => x.to_owned(),
        None => path.to_owned(),
    }
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
pub trait RequestDebug {
    fn get_request_info(&self) -> String;
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump http request information to the log.
pub fn debug_request(http_req: &Request, req: &impl RequestDebug) {
    // Check that debug or higher logging is in effect.
    if log::max_level() < LevelFilter::Debug {
        return;
    }

    let mut s = "\n".to_string();

    // Restate the URI.
    let uri = http_req.uri();
    s += format!("  URI: {:?}\n", uri).as_str();

    // Accumulate the headers
    for v in http_req.headers().iter() {
        s += format!("  Header: {} = {:?} \n", v.0, v.1).as_str();
    }

    if let Some(q) = uri.query() {
        s += format!("  Query Parameters: {:?}\n", q).as_str();
    } else {
        s += "  * No Query Parameters\n";
    }

    s += req.get_request_info().as_str();

    // Write the single log record.
    debug!("{}", s);
}
