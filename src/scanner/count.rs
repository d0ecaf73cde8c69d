use glob::Pattern;
use std::fs;
use std::path::Path;

use crate::utils::file::is_path_excluded;

/// Count `(files, directories, excluded)` under `path`, which may be a file.
pub fn count<P: AsRef<Path>>(
    path: P,
    max_depth: usize,
    exclude_patterns: &[Pattern],
) -> std::io::Result<(usize, usize, usize)> {
    let path = path.as_ref();

    if is_path_excluded(path, exclude_patterns) {
        return Ok((0, 0, 1));
    }
    // An input given as a single file is one file and contains no directory.
    if fs::metadata(path)?.is_file() {
        return Ok((1, 0, 0));
    }

    let mut files_count = 0;
    let mut dirs_count = 1;
    let mut excluded_count = 0;

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();

        if is_path_excluded(&entry_path, exclude_patterns) {
            excluded_count += 1;
            continue;
        }

        let metadata = entry.metadata()?;
        if metadata.is_file() {
            files_count += 1;
        } else if metadata.is_dir() {
            if max_depth > 0 {
                let (sub_files, sub_dirs, sub_excluded) =
                    count(&entry_path, max_depth - 1, exclude_patterns)?;
                files_count += sub_files;
                dirs_count += sub_dirs;
                excluded_count += sub_excluded;
            } else {
                dirs_count += 1;
            }
        }
    }

    Ok((files_count, dirs_count, excluded_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_count_single_file_input() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("LICENSE");
        fs::write(&file, "MIT License").unwrap();
        assert_eq!(count(&file, 50, &[]).unwrap(), (1, 0, 0));
    }

    #[test]
    fn test_count_excluded_file_input() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.tmp");
        fs::write(&file, "").unwrap();
        let patterns = vec![Pattern::new("*.tmp").unwrap()];
        assert_eq!(count(&file, 50, &patterns).unwrap(), (0, 0, 1));
    }
}
