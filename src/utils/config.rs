#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use serde::Deserialize;
use std::{env, fs};
use lazy_static::lazy_static;
use structopt::StructOpt;

// Hello Utilities
use crate::utils::{hello_utils, errors::Errors};

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Environment variables.  The backend port falls back from BACKEND_PORT to
// PORT before the default is used.
const ENV_CONFIG_FILE       : &str = "HELLO_CONFIG_FILE";
const ENV_LOG_CONFIG_FILE   : &str = "HELLO_LOG_CONFIG";
const ENV_BACKEND_PORT      : &str = "BACKEND_PORT";
const ENV_PORT              : &str = "PORT";
const ENV_FRONTEND_PORT     : &str = "FRONTEND_PORT";
const ENV_API_BASE_URL      : &str = "API_BASE_URL";

// Files.
const DEFAULT_CONFIG_FILE   : &str = "~/.hello/hello.toml";

// Networking.
const DEFAULT_HTTP_ADDR     : &str = "0.0.0.0";
pub const FRONTEND_HTTP_ADDR: &str = "127.0.0.1";
const DEFAULT_BACKEND_PORT  : u16  = 8014;
const DEFAULT_FRONTEND_PORT : u16  = 3000;

// Console logging used when no log4rs file is configured.
const LOG_PATTERN           : &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {h({l:5})} {t} - {m}{n}";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref HELLO_ARGS: HelloArgs = init_hello_args();
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// HelloArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "hello_server", about = "Greeting service and its client.")]
pub struct HelloArgs {
    /// Path of the TOML configuration file.
    ///
    /// The file is located using the following priority order:
    ///
    ///   1. If set, the value of the HELLO_CONFIG_FILE environment variable,
    ///
    ///   2. Otherwise, if set, the value of this argument,
    ///
    ///   3. Otherwise, ~/.hello/hello.toml
    ///
    /// A missing file means all defaults are used.
    #[structopt(short, long)]
    pub config: Option<String>,

    /// Path of a log4rs YAML configuration file.
    ///
    /// HELLO_LOG_CONFIG takes precedence.  Without either, logs go to
    /// stderr at info level.
    #[structopt(short, long)]
    pub log_config: Option<String>,

    #[structopt(subcommand)]
    pub cmd: Option<Command>,
}

// ---------------------------------------------------------------------------
// Command:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, StructOpt)]
pub enum Command {
    /// Run the greeting service (the default).
    #[default]
    Serve,

    /// Run the client development server: the greeting form plus a proxy
    /// that forwards /hello/* to the greeting service.
    Frontend,

    /// Submit one greeting request and print the response.
    Greet {
        /// Name to greet.  Without it the bare greeting is requested.
        #[structopt(short, long)]
        name: Option<String>,
    },

    /// Write the database user provisioning script.
    ProvisionDb {
        /// Output file, stdout when omitted.
        #[structopt(short, long)]
        output: Option<String>,

        /// Database the user is granted readWrite on.
        #[structopt(long)]
        database: Option<String>,

        /// Name of the user to create.
        #[structopt(long)]
        user: Option<String>,

        /// Password of the user to create.
        #[structopt(long)]
        password: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub hello_args: &'static HelloArgs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub backend_port: u16,
    pub frontend_port: u16,
    pub api_base_url: Option<String>,
    pub tls_cert_file: Option<String>,
    pub tls_key_file: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Base URL the client talks to: the explicit override or the local
    /// greeting service.
    pub fn upstream_base_url(&self) -> String {
        match &self.api_base_url {
            Some(url) => url.clone(),
            None => format!("http://localhost:{}", self.backend_port),
        }
    }

    /// The single message shown to users when a greeting request fails.
    pub fn failure_message(&self) -> String {
        format!("Failed to connect to the server. Make sure the backend is running on port {}.",
                self.backend_port)
    }

    /// Certificate and key paths, only when both are configured.
    pub fn tls_files(&self) -> Result<Option<(String, String)>> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Ok(Some((hello_utils::get_absolute_path(cert),
                                                hello_utils::get_absolute_path(key)))),
            (None, None) => Ok(None),
            _ => Err(anyhow!(Errors::HelloError(
                     "tls_cert_file and tls_key_file must be configured together".to_string()))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Hello Server".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            backend_port: DEFAULT_BACKEND_PORT,
            frontend_port: DEFAULT_FRONTEND_PORT,
            api_base_url: None,
            tls_cert_file: None,
            tls_key_file: None,
        }
    }
}

// ***************************************************************************
//                            Argument Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_hello_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_hello_args() -> HelloArgs {
    HelloArgs::from_args()
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
pub fn init_log() {
    match log_config_file() {
        Some(logconfig) => {
            if let Err(e) = log4rs::init_file(&logconfig, Default::default()) {
                eprintln!("{}", e);
                panic!("{}", Errors::Log4rsInitialization(logconfig));
            }
            info!("Log4rs initialized using: {}", logconfig);
        },
        None => {
            let result = default_log_config()
                .and_then(|c| log4rs::init_config(c).map_err(|e| anyhow!(e)));
            if let Err(e) = result {
                panic!("{}: {}", Errors::Log4rsInitialization("<console>".to_string()), e);
            }
            info!("Log4rs initialized with console logging.");
        },
    }
}

// ---------------------------------------------------------------------------
// log_config_file:
// ---------------------------------------------------------------------------
fn log_config_file() -> Option<String> {
    env::var(ENV_LOG_CONFIG_FILE).ok()
        .or_else(|| HELLO_ARGS.log_config.clone())
        .map(|f| hello_utils::get_absolute_path(&f))
}

// ---------------------------------------------------------------------------
// default_log_config:
// ---------------------------------------------------------------------------
/** Console logging to stderr so that stdout stays clean for command output. */
fn default_log_config() -> Result<log4rs::Config> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))?;
    Ok(config)
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_config_file:
// ---------------------------------------------------------------------------
fn get_config_file() -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --config argument
    //  3. Default location
    let config_file = env::var(ENV_CONFIG_FILE).unwrap_or_else(
        |_| {
            match HELLO_ARGS.config.clone() {
                Some(c) => c,
                None => DEFAULT_CONFIG_FILE.to_string(),
            }
        });

    hello_utils::get_absolute_path(&config_file)
}

// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Read the configuration file, falling back to defaults when it doesn't
 * exist, and then apply the environment variable overrides.
 */
fn get_parms(config_file: String) -> Result<Parms> {
    info!("{}", Errors::ReadingConfigFile(config_file.clone()));
    let config = match fs::read_to_string(&config_file) {
        Ok(contents) => parse_config(&contents, &config_file)?,
        Err(_) => {
            info!("Unable to read configuration at {}. Using default values.", config_file);
            Config::new()
        }
    };

    let config = apply_env_overrides(config, |k| env::var(k).ok())?;
    Ok(Parms { config_file, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
fn parse_config(contents: &str, config_file: &str) -> Result<Config> {
    match toml::from_str(contents) {
        Ok(c)  => Ok(c),
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file.to_string()), e);
            error!("{}", msg);
            Err(anyhow!(msg))
        }
    }
}

// ---------------------------------------------------------------------------
// apply_env_overrides:
// ---------------------------------------------------------------------------
/** Environment values take precedence over the configuration file.  The
 * lookup function is passed in so that tests don't depend on the process
 * environment.
 */
fn apply_env_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let backend = lookup(ENV_BACKEND_PORT)
        .map(|v| (ENV_BACKEND_PORT, v))
        .or_else(|| lookup(ENV_PORT).map(|v| (ENV_PORT, v)));
    if let Some((var, value)) = backend {
        config.backend_port = parse_port(var, &value)?;
    }
    if let Some(value) = lookup(ENV_FRONTEND_PORT) {
        config.frontend_port = parse_port(ENV_FRONTEND_PORT, &value)?;
    }
    if let Some(url) = lookup(ENV_API_BASE_URL) {
        if !url.is_empty() {
            config.api_base_url = Some(url);
        }
    }
    Ok(config)
}

fn parse_port(var: &str, value: &str) -> Result<u16> {
    value.trim().parse::<u16>()
        .map_err(|_| anyhow!(Errors::InvalidEnvVar(var.to_string(), value.to_string())))
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context() -> RuntimeCtx {
    // The application aborts if the configuration can't be established.
    let parms = match get_parms(get_config_file()) {
        Ok(p) => p,
        Err(e) => {
            error!("FAILED to read configuration: {}", e);
            panic!("FAILED to read configuration: {}", e);
        }
    };
    RuntimeCtx {parms, hello_args: &HELLO_ARGS}
}
