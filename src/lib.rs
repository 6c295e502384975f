// Re-export modules
pub mod config;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod observers;
pub mod results;
pub mod scanner;
pub mod session;
pub mod writer;

// Re-export commonly used types for convenience
pub use config::{ScanConfig, ScanTarget};
pub use error::ScanError;
pub use results::ScanReport;
pub use scanner::Scanner;
