use serde::Serialize;

use super::FileInfo;

pub const OUTPUT_FORMAT_VERSION: &str = "1.0.0";

#[derive(Serialize, Debug)]
pub struct Output {
    pub headers: Vec<Header>,
    pub files: Vec<FileInfo>,
}

#[derive(Serialize, Debug)]
pub struct Header {
    pub tool_name: String,
    pub tool_version: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub duration: f64,
    pub options: ScanOptions,
    pub extra_data: ExtraData,
    pub errors: Vec<String>,
    pub output_format_version: String,
}

/// Effective options of a scan.
#[derive(Serialize, Debug)]
pub struct ScanOptions {
    pub input: Vec<String>,
    pub rules: String,
    pub license_score: f32,
    pub license_text: bool,
    pub max_depth: usize,
    pub exclude: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct ExtraData {
    pub files_count: usize,
    pub directories_count: usize,
    pub excluded_count: usize,
    pub rules_count: usize,
    pub system_environment: SystemEnvironment,
}

#[derive(Serialize, Debug)]
pub struct SystemEnvironment {
    pub operating_system: Option<String>,
    pub cpu_architecture: String,
    pub platform: String,
    pub rust_version: String,
}
