use anyhow::{Context, Error, anyhow};
use content_inspector::{ContentType, inspect};
use glob::Pattern;
use indicatif::ProgressBar;
use log::warn;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::license_detection::LicenseDetectionEngine;
use crate::models::{FileInfo, FileInfoBuilder, FileType, LicenseMatchOutput};
use crate::scanner::ProcessResult;
use crate::utils::file::{get_creation_date, is_path_excluded};
use crate::utils::hash::calculate_sha1;

/// Scan `path`, a file or a directory walked up to `max_depth` levels deep.
///
/// Files of a directory are scanned in parallel. A file that cannot be read or
/// scanned is still reported, with its errors in `scan_errors`.
pub fn process<P: AsRef<Path>>(
    path: P,
    max_depth: usize,
    progress_bar: Arc<ProgressBar>,
    exclude_patterns: &[Pattern],
    engine: &LicenseDetectionEngine,
    include_text: bool,
) -> Result<ProcessResult, Error> {
    let path = path.as_ref();

    if is_path_excluded(path, exclude_patterns) {
        return Ok(ProcessResult {
            files: Vec::new(),
            excluded_count: 1,
        });
    }

    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
    if metadata.is_file() {
        let file = process_file(path, &metadata, engine, include_text);
        progress_bar.inc(1);
        return Ok(ProcessResult {
            files: vec![file],
            excluded_count: 0,
        });
    }

    let mut all_files = Vec::new();
    let mut total_excluded = 0;

    let entries: Vec<_> = fs::read_dir(path)
        .with_context(|| format!("Failed to read directory {}", path.display()))?
        .filter_map(Result::ok)
        .collect();

    let mut file_entries = Vec::new();
    let mut dir_entries = Vec::new();

    for entry in entries {
        let path = entry.path();

        if is_path_excluded(&path, exclude_patterns) {
            total_excluded += 1;
            continue;
        }

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => file_entries.push((path, metadata)),
            Ok(metadata) if metadata.is_dir() => dir_entries.push((path, metadata)),
            _ => continue,
        }
    }
    file_entries.sort_by(|a, b| a.0.cmp(&b.0));
    dir_entries.sort_by(|a, b| a.0.cmp(&b.0));

    all_files.append(
        &mut file_entries
            .par_iter()
            .map(|(path, metadata)| {
                let file_info = process_file(path, metadata, engine, include_text);
                progress_bar.inc(1);
                file_info
            })
            .collect(),
    );

    for (path, metadata) in dir_entries {
        all_files.push(process_directory(&path, &metadata));

        if max_depth > 0 {
            match process(
                &path,
                max_depth - 1,
                Arc::clone(&progress_bar),
                exclude_patterns,
                engine,
                include_text,
            ) {
                Ok(mut result) => {
                    all_files.append(&mut result.files);
                    total_excluded += result.excluded_count;
                }
                Err(e) => warn!("Error processing directory {}: {:#}", path.display(), e),
            }
        }
    }

    Ok(ProcessResult {
        files: all_files,
        excluded_count: total_excluded,
    })
}

fn process_file(
    path: &Path,
    metadata: &fs::Metadata,
    engine: &LicenseDetectionEngine,
    include_text: bool,
) -> FileInfo {
    let mut builder = FileInfoBuilder::default();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    builder
        .name(name)
        .base_name(
            path.file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
        )
        .extension(
            path.extension()
                .map_or(String::new(), |ext| format!(".{}", ext.to_string_lossy())),
        )
        .path(path.to_string_lossy().to_string())
        .file_type(FileType::File)
        .size(metadata.len())
        .date(get_creation_date(metadata));

    let mut scan_errors = Vec::new();
    if let Err(e) = scan_content(&mut builder, path, engine, include_text) {
        warn!("Failed to scan {}: {:#}", path.display(), e);
        scan_errors.push(format!("{:#}", e));
    }

    builder
        .scan_errors(scan_errors)
        .build()
        .unwrap_or_else(|e| FileInfo {
            file_type: FileType::File,
            scan_errors: vec![e.to_string()],
            ..FileInfo::directory(String::new(), path.to_string_lossy().to_string(), None)
        })
}

fn scan_content(
    builder: &mut FileInfoBuilder,
    path: &Path,
    engine: &LicenseDetectionEngine,
    include_text: bool,
) -> Result<(), Error> {
    let buffer = fs::read(path)?;
    builder.sha1(Some(calculate_sha1(&buffer)));

    if inspect(&buffer) != ContentType::UTF_8 {
        return Ok(());
    }
    let text = String::from_utf8(buffer).map_err(|e| anyhow!("Invalid UTF-8: {}", e))?;
    builder.is_text(true).matches(scan_file(engine, &text, include_text));
    Ok(())
}

/// Detect licenses in the text of one file.
pub fn scan_file(
    engine: &LicenseDetectionEngine,
    text: &str,
    include_text: bool,
) -> Vec<LicenseMatchOutput> {
    engine
        .detect(text)
        .iter()
        .map(|m| LicenseMatchOutput::from_match(m, text, include_text))
        .collect()
}

fn process_directory(path: &Path, metadata: &fs::Metadata) -> FileInfo {
    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    FileInfo::directory(
        name,
        path.to_string_lossy().to_string(),
        get_creation_date(metadata),
    )
}
