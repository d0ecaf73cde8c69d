use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde_json::to_string_pretty;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use provenant_license::cli::Cli;
use provenant_license::license_detection::{LicenseDetectionEngine, MatchOptionsBuilder};
use provenant_license::models::{
    ExtraData, FileInfo, FileType, Header, OUTPUT_FORMAT_VERSION, Output, ScanOptions, SystemEnvironment,
};
use provenant_license::scanner::{count, process};
use provenant_license::utils::file::compile_exclude_patterns;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let start_time = Utc::now();

    let exclude_patterns = compile_exclude_patterns(&cli.exclude);

    let mut total_files = 0;
    let mut total_dirs = 0;
    for input in &cli.input {
        let (files, dirs, _) = count(input, cli.max_depth, &exclude_patterns)
            .with_context(|| format!("Failed to read input {}", input))?;
        total_files += files;
        total_dirs += dirs;
    }
    println!("Found {} files in {} directories", total_files, total_dirs);

    let engine = init_license_engine(&cli)?;

    let progress_bar = create_progress_bar(total_files)?;
    let mut files = Vec::new();
    let mut excluded_count = 0;
    for input in &cli.input {
        let result = process(
            input,
            cli.max_depth,
            Arc::clone(&progress_bar),
            &exclude_patterns,
            &engine,
            cli.license_text,
        )?;
        files.extend(result.files);
        excluded_count += result.excluded_count;
    }
    progress_bar.finish_with_message("Scan complete!");

    let end_time = Utc::now();
    let output = create_output(
        &cli,
        start_time,
        end_time,
        files,
        total_dirs,
        excluded_count,
        engine.index().len(),
    );
    write_output(&cli.output_file, &output)?;

    println!("JSON output written to {}", cli.output_file);
    Ok(())
}

fn init_license_engine(cli: &Cli) -> Result<LicenseDetectionEngine> {
    let options = MatchOptionsBuilder::default()
        .min_score(cli.license_score)
        .build()?;
    let engine = LicenseDetectionEngine::new(Path::new(&cli.rules))
        .with_context(|| format!("Failed to load license rules from {}", cli.rules))?
        .with_options(options);
    info!(
        "License detection engine initialized with {} rules from {}",
        engine.index().len(),
        cli.rules
    );
    Ok(engine)
}

fn create_progress_bar(total_files: usize) -> Result<Arc<ProgressBar>> {
    let progress_bar = ProgressBar::new(total_files as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files processed ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(Arc::new(progress_bar))
}

fn create_output(
    cli: &Cli,
    start_time: chrono::DateTime<Utc>,
    end_time: chrono::DateTime<Utc>,
    files: Vec<FileInfo>,
    total_dirs: usize,
    excluded_count: usize,
    rules_count: usize,
) -> Output {
    let duration = (end_time - start_time).num_nanoseconds().unwrap_or(0) as f64 / 1_000_000_000.0;

    let extra_data = ExtraData {
        files_count: files
            .iter()
            .filter(|f| f.file_type == FileType::File)
            .count(),
        directories_count: total_dirs,
        excluded_count,
        rules_count,
        system_environment: SystemEnvironment {
            operating_system: sys_info::os_type().ok(),
            cpu_architecture: env::consts::ARCH.to_string(),
            platform: format!(
                "{}-{}-{}",
                sys_info::os_type().unwrap_or_else(|_| "unknown".to_string()),
                sys_info::os_release().unwrap_or_else(|_| "unknown".to_string()),
                env::consts::ARCH
            ),
            rust_version: rustc_version_runtime::version().to_string(),
        },
    };

    let errors: Vec<String> = files
        .iter()
        .flat_map(|file| {
            file.scan_errors
                .iter()
                .map(move |error| format!("{}: {}", file.path, error))
        })
        .collect();

    Output {
        headers: vec![Header {
            tool_name: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            start_timestamp: start_time.to_rfc3339(),
            end_timestamp: end_time.to_rfc3339(),
            duration,
            options: ScanOptions {
                input: cli.input.clone(),
                rules: cli.rules.clone(),
                license_score: cli.license_score,
                license_text: cli.license_text,
                max_depth: cli.max_depth,
                exclude: cli.exclude.clone(),
            },
            extra_data,
            errors,
            output_format_version: OUTPUT_FORMAT_VERSION.to_string(),
        }],
        files,
    }
}

fn write_output(output_file: &str, output: &Output) -> Result<()> {
    let json_output = to_string_pretty(output)?;
    let mut file = File::create(output_file)
        .with_context(|| format!("Failed to create output file {}", output_file))?;
    file.write_all(json_output.as_bytes())?;
    Ok(())
}
