//! `shrew check`: run the front end and check passes over a set of files.

use super::common::{Frontend, parse_or_report, read_source, report_semantic_errors};
use shrew_sema::analyze;
use std::path::{Path, PathBuf};

pub fn run(paths: &[String]) -> i32 {
    let files = collect_files(paths);
    if files.is_empty() {
        eprintln!("shrew: no input files matched");
        return 1;
    }

    let mut total_errors = 0;
    for file in &files {
        let Some(source) = read_source(file) else {
            total_errors += 1;
            continue;
        };
        let Some(Frontend { program, interner }) = parse_or_report(file, &source) else {
            total_errors += 1;
            continue;
        };
        let analysis = analyze(&program, &interner);
        total_errors += report_semantic_errors(file, &source, &analysis);
    }

    if total_errors == 0 {
        println!("checked {} file(s), no errors", files.len());
        0
    } else {
        eprintln!(
            "{total_errors} error{} in {} file(s)",
            if total_errors == 1 { "" } else { "s" },
            files.len()
        );
        1
    }
}

/// Expand files, directories (recursively, `.shrew` only), and glob
/// patterns into a sorted, deduplicated file list.
fn collect_files(patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if path.is_dir() {
            let dir_glob = format!("{}/**/*.shrew", pattern.trim_end_matches('/'));
            if let Ok(matches) = glob::glob(&dir_glob) {
                files.extend(matches.flatten());
            }
            continue;
        }
        if let Ok(matches) = glob::glob(pattern) {
            files.extend(matches.flatten().filter(|p| p.is_file()));
        }
    }
    files.sort();
    files.dedup();
    files
}
