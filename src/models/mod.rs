mod file_info;
mod output;

pub use file_info::{FileInfo, FileInfoBuilder, FileType, LicenseMatchOutput};
pub use output::{ExtraData, Header, OUTPUT_FORMAT_VERSION, Output, ScanOptions, SystemEnvironment};
