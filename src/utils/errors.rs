#![forbid(unsafe_code)]

use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("hello_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    #[error("Invalid value for environment variable {}: {}", .0, .1)]
    InvalidEnvVar(String, String),

    #[error("Unable to render template {}: {}", .0, .1)]
    TemplateError(String, String),

    #[error("Greeting request failed: {}", .0)]
    RequestFailed(String),

    #[error("Hello Server Error: {}", .0)]
    HelloError(String),
}
