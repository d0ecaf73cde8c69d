pub mod cli;
pub mod license_detection;
pub mod models;
pub mod scanner;
pub mod utils;

pub use license_detection::{LicenseDetectionEngine, LicenseMatch, MatchOptions, MatchOptionsBuilder};
pub use models::{ExtraData, FileInfo, FileType, Header, Output, SystemEnvironment};
pub use scanner::{ProcessResult, count, process};
