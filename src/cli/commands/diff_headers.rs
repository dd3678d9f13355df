//! diff-headers command - Extract per-file hunk headers from a diff

use anyhow::{Context as _, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use super::print_json;
use crate::parser::get_hunk_headers;

/// Parse a diff from `file` (or stdin) and print its hunk headers.
pub fn diff_headers(file: Option<&Path>) -> Result<()> {
    let headers = match file {
        Some(path) => {
            let f = File::open(path)
                .with_context(|| format!("Failed to open '{}'", path.display()))?;
            get_hunk_headers(BufReader::new(f))?
        }
        None => get_hunk_headers(io::stdin().lock())?,
    };

    print_json(&headers)
}
