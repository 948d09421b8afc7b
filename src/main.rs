#![forbid(unsafe_code)]

use anyhow::Result;
use lazy_static::lazy_static;
use log::info;
use poem::listener::{BoxListener, Listener, RustlsCertificate, RustlsConfig, TcpListener};

// Hello Utilities
use crate::client::dev_server::{dev_server_app, DevServer};
use crate::provision::DbProvisioning;
use crate::utils::config::{init_log, init_runtime_context, Command, RuntimeCtx, FRONTEND_HTTP_ADDR};
use crate::utils::errors::Errors;

// Modules
mod client;
mod provision;
mod routes;
mod utils;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME   : &str = "HelloServer";    // for poem logging
const FRONTEND_NAME : &str = "HelloFrontend";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the parameters variable so that is has a 'static lifetime.
// We exit if we can't read our parameters.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<()> {
    hello_init();

    let cmd = RUNTIME_CTX.hello_args.cmd.clone().unwrap_or_default();
    match cmd {
        Command::Serve => run_service().await,
        Command::Frontend => run_frontend().await,
        Command::Greet { name } => {
            let config = &RUNTIME_CTX.parms.config;
            let ok = client::run_greet(&config.upstream_base_url(), &config.failure_message(), name).await?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        },
        Command::ProvisionDb { output, database, user, password } => {
            DbProvisioning::from_args(database, user, password).write_script(output.as_deref())
        },
    }
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// hello_init:
// ---------------------------------------------------------------------------
/** Configure logging and force the reading of the runtime context. */
fn hello_init() {
    init_log();
    info!("{}", Errors::InputParms(format!("{:#?}", *RUNTIME_CTX)));
    info!("Configuration source: {}", RUNTIME_CTX.parms.config_file);
    print_version_info();
}

// ---------------------------------------------------------------------------
// run_service:
// ---------------------------------------------------------------------------
async fn run_service() -> Result<()> {
    let config = &RUNTIME_CTX.parms.config;
    let port = config.backend_port;
    let server_url = format!("http://localhost:{}", port);
    let app = routes::service_app(&server_url);

    let addr = format!("{}:{}", config.http_addr, port);
    let listener = make_listener(addr)?;

    // The startup banner is diagnostic only.
    println!("Server is running on port {}", port);
    println!("Visit http://localhost:{}/hello/world", port);
    println!("Or with a name: http://localhost:{}/hello/world?name=John", port);

    poem::Server::new(listener)
        .name(SERVER_NAME)
        .run(app)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// run_frontend:
// ---------------------------------------------------------------------------
async fn run_frontend() -> Result<()> {
    let config = &RUNTIME_CTX.parms.config;
    let upstream = config.upstream_base_url();
    let server = DevServer::new(&config.title, &upstream, &config.failure_message())?;

    let addr = format!("{}:{}", FRONTEND_HTTP_ADDR, config.frontend_port);
    info!("Client development server on http://{}, proxying /hello/* to {}", addr, upstream);

    poem::Server::new(TcpListener::bind(addr))
        .name(FRONTEND_NAME)
        .run(dev_server_app(server))
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// make_listener:
// ---------------------------------------------------------------------------
/** Plain TCP unless both TLS files are configured. */
fn make_listener(addr: String) -> Result<BoxListener> {
    let listener = TcpListener::bind(addr);
    match RUNTIME_CTX.parms.config.tls_files()? {
        Some((cert, key)) => {
            info!("Serving TLS using certificate {}", cert);
            Ok(listener.rustls(
                RustlsConfig::new().fallback(
                    RustlsCertificate::new()
                        .key(std::fs::read(key)?)
                        .cert(std::fs::read(cert)?),
                ),
            ).boxed())
        },
        None => Ok(listener.boxed()),
    }
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("\n*** Running HELLO_SERVER={}, BRANCH={}, COMMIT={}, DIRTY={}, SRC_TS={}, RUSTC={}",
          option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
          env!("GIT_BRANCH"),
          env!("GIT_COMMIT_SHORT"),
          env!("GIT_DIRTY"),
          env!("SOURCE_TIMESTAMP"),
          env!("RUSTC_VERSION"));
}
