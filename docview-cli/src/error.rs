//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use docview::asset::TransportError;
use docview::bus::SessionFailure;
use docview::config::ConfigFileError;
use docview::ViewerError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Invalid command-line value
    Argument(String),
    /// Failed to create the asset transport
    Transport(TransportError),
    /// Viewer rejected an operation
    Viewer(ViewerError),
    /// The document failed to load
    Load(SessionFailure),
    /// The viewer was torn down before the document became ready
    Destroyed,
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Viewer(ViewerError::Config(_)) => {
                eprintln!();
                eprintln!("Pass the document's asset location with --url, or set");
                eprintln!("  [viewer] url = <location>");
                eprintln!("in ~/.docview/config.ini");
            }
            CliError::Load(_) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. The URL must point at the directory holding info.json");
                eprintln!("  2. Local documents can be given as a path or a file:// URL");
                eprintln!("  3. Run with RUST_LOG=docview=debug for request details");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Argument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Transport(e) => write!(f, "Failed to create transport: {}", e),
            CliError::Viewer(e) => write!(f, "Viewer error: {}", e),
            CliError::Load(e) => write!(f, "Document failed to load: {}", e),
            CliError::Destroyed => write!(f, "Viewer was destroyed before the document loaded"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Transport(e) => Some(e),
            CliError::Viewer(e) => Some(e),
            CliError::Load(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Transport(e)
    }
}

impl From<ViewerError> for CliError {
    fn from(e: ViewerError) -> Self {
        CliError::Viewer(e)
    }
}
