//! parser::diff_headers
//!
//! Extract per-file hunk headers from a unified diff.
//!
//! # Algorithm
//!
//! A single forward pass with at most one open file record:
//!
//! - a `diff --git a/<old> b/<new>` line closes the open record and opens
//!   a new one
//! - a `@@ -l,s +l,s @@` line is appended to the open record; with no open
//!   record the input is malformed and nothing is returned
//! - every other line is ignored
//!
//! At end of input the open record is closed.
//!
//! Paths are taken from a plain `a/<path> b/<path>` match. Quoted or
//! escaped paths (as git emits for unusual file names) are not decoded.
//!
//! # Example
//!
//! ```
//! use gitread::parser::get_hunk_headers_str;
//!
//! let diff = "diff --git a/foo.txt b/foo.txt\n@@ -1,3 +1,4 @@\n+added\n";
//! let files = get_hunk_headers_str(diff).unwrap();
//!
//! assert_eq!(files.len(), 1);
//! assert_eq!(files[0].file_header.new_file_name, "foo.txt");
//! assert_eq!(files[0].hunk_headers[0].new_span, 4);
//! ```

use std::io::BufRead;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::types::{DiffFileHeader, DiffFileHunkHeaders, HunkHeader};

static FILE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^diff --git a/(.+) b/(.+)$").unwrap_or_else(|e| panic!("invalid regex: {e}"))
});

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$")
        .unwrap_or_else(|e| panic!("invalid regex: {e}"))
});

/// Errors from diff header parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A hunk header appeared before any file header.
    #[error("malformed diff: hunk header on line {line} has no preceding file header")]
    HunkWithoutFile { line: usize },

    #[error("failed to read diff: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a `diff --git a/<old> b/<new>` line.
///
/// Returns `None` if the line is not a file header.
pub fn parse_diff_file_header(line: &str) -> Option<DiffFileHeader> {
    let caps = FILE_HEADER.captures(line)?;
    Some(DiffFileHeader {
        old_file_name: caps[1].to_string(),
        new_file_name: caps[2].to_string(),
    })
}

/// Parse a `@@ -l[,s] +l[,s] @@[ text]` line.
///
/// An omitted span means one line. Returns `None` if the line is not a hunk
/// header or a number does not fit in `u32`.
pub fn parse_diff_hunk_header(line: &str) -> Option<HunkHeader> {
    let caps = HUNK_HEADER.captures(line)?;
    let number = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(1),
        }
    };

    let text = &caps[5];
    Some(HunkHeader {
        old_line: number(1)?,
        old_span: number(2)?,
        new_line: number(3)?,
        new_span: number(4)?,
        text: text.strip_prefix(' ').unwrap_or(text).to_string(),
    })
}

/// Collect the hunk headers of every file in a unified diff.
///
/// Files appear in input order, each with its hunks in input order. A file
/// without hunks (binary, mode-only, rename-only) still gets a record.
///
/// # Errors
///
/// - `HunkWithoutFile` if a hunk header precedes every file header
/// - `Io` if reading fails
pub fn get_hunk_headers<R: BufRead>(mut reader: R) -> Result<Vec<DiffFileHunkHeaders>, ParseError> {
    let mut files = Vec::new();
    let mut current: Option<DiffFileHunkHeaders> = None;
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        // Diff bodies may hold arbitrary bytes; only header lines matter.
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches('\n').trim_end_matches('\r');

        if let Some(file_header) = parse_diff_file_header(line) {
            if let Some(done) = current.take() {
                files.push(done);
            }
            current = Some(DiffFileHunkHeaders {
                file_header,
                hunk_headers: Vec::new(),
            });
            continue;
        }

        if let Some(hunk) = parse_diff_hunk_header(line) {
            match current.as_mut() {
                Some(file) => file.hunk_headers.push(hunk),
                None => return Err(ParseError::HunkWithoutFile { line: line_no }),
            }
        }
    }

    if let Some(done) = current {
        files.push(done);
    }

    Ok(files)
}

/// [`get_hunk_headers`] over in-memory text.
pub fn get_hunk_headers_str(diff: &str) -> Result<Vec<DiffFileHunkHeaders>, ParseError> {
    get_hunk_headers(diff.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod file_header {
        use super::*;

        #[test]
        fn plain_paths() {
            let header = parse_diff_file_header("diff --git a/src/lib.rs b/src/lib.rs").unwrap();
            assert_eq!(header.old_file_name, "src/lib.rs");
            assert_eq!(header.new_file_name, "src/lib.rs");
        }

        #[test]
        fn rename() {
            let header = parse_diff_file_header("diff --git a/old.txt b/new.txt").unwrap();
            assert_eq!(header.old_file_name, "old.txt");
            assert_eq!(header.new_file_name, "new.txt");
        }

        #[test]
        fn not_a_header() {
            assert!(parse_diff_file_header("--- a/foo.txt").is_none());
            assert!(parse_diff_file_header("diff --cc foo.txt").is_none());
            assert!(parse_diff_file_header(" diff --git a/x b/x").is_none());
        }
    }

    mod hunk_header {
        use super::*;

        #[test]
        fn full_form() {
            let hunk = parse_diff_hunk_header("@@ -10,7 +12,9 @@ fn main() {").unwrap();
            assert_eq!(
                (hunk.old_line, hunk.old_span, hunk.new_line, hunk.new_span),
                (10, 7, 12, 9)
            );
            assert_eq!(hunk.text, "fn main() {");
        }

        #[test]
        fn omitted_spans_default_to_one() {
            let hunk = parse_diff_hunk_header("@@ -3 +4 @@").unwrap();
            assert_eq!(
                (hunk.old_line, hunk.old_span, hunk.new_line, hunk.new_span),
                (3, 1, 4, 1)
            );
            assert_eq!(hunk.text, "");
        }

        #[test]
        fn empty_file_side() {
            let hunk = parse_diff_hunk_header("@@ -0,0 +1,2 @@").unwrap();
            assert_eq!((hunk.old_line, hunk.old_span), (0, 0));
            assert_eq!((hunk.new_line, hunk.new_span), (1, 2));
        }

        #[test]
        fn overflow_is_not_a_header() {
            assert!(parse_diff_hunk_header("@@ -99999999999,1 +1,1 @@").is_none());
        }

        #[test]
        fn not_a_header() {
            assert!(parse_diff_hunk_header("@@@ -1,1 -1,1 +1,1 @@@").is_none());
            assert!(parse_diff_hunk_header("+@@ -1,1 +1,1 @@").is_none());
        }
    }

    mod get_hunk_headers {
        use super::*;

        #[test]
        fn two_files_one_without_hunks() {
            let diff = "diff --git a/foo.txt b/foo.txt\n\
                        @@ -1,3 +1,4 @@\n\
                        diff --git a/bar.txt b/bar.txt\n";

            let files = get_hunk_headers_str(diff).unwrap();

            assert_eq!(files.len(), 2);
            assert_eq!(files[0].file_header.old_file_name, "foo.txt");
            assert_eq!(
                files[0].hunk_headers,
                vec![HunkHeader {
                    old_line: 1,
                    old_span: 3,
                    new_line: 1,
                    new_span: 4,
                    text: String::new(),
                }]
            );
            assert_eq!(files[1].file_header.new_file_name, "bar.txt");
            assert!(files[1].hunk_headers.is_empty());
        }

        #[test]
        fn hunk_before_file_is_malformed() {
            let diff = "@@ -1,1 +1,1 @@\ndiff --git a/foo.txt b/foo.txt\n";

            let err = get_hunk_headers_str(diff).unwrap_err();

            assert!(matches!(err, ParseError::HunkWithoutFile { line: 1 }));
        }

        #[test]
        fn body_lines_ignored() {
            let diff = "diff --git a/a.rs b/a.rs\n\
                        index 83db48f..bf269f4 100644\n\
                        --- a/a.rs\n\
                        +++ b/a.rs\n\
                        @@ -1,2 +1,2 @@ mod a;\n\
                        -old\n\
                        +new\n\
                         same\n\
                        @@ -20 +20 @@\n\
                        -x\n\
                        +y\n";

            let files = get_hunk_headers_str(diff).unwrap();

            assert_eq!(files.len(), 1);
            assert_eq!(files[0].hunk_headers.len(), 2);
            assert_eq!(files[0].hunk_headers[0].text, "mod a;");
            assert_eq!(files[0].hunk_headers[1].old_line, 20);
        }

        #[test]
        fn crlf_line_endings() {
            let diff = "diff --git a/w.txt b/w.txt\r\n@@ -1,2 +1,3 @@\r\n";

            let files = get_hunk_headers_str(diff).unwrap();

            assert_eq!(files[0].file_header.new_file_name, "w.txt");
            assert_eq!(files[0].hunk_headers[0].new_span, 3);
        }

        #[test]
        fn invalid_utf8_in_body() {
            let mut diff = b"diff --git a/bin b/bin\n@@ -1 +1 @@\n-".to_vec();
            diff.extend_from_slice(&[0xff, 0xfe, b'\n']);

            let files = get_hunk_headers(diff.as_slice()).unwrap();

            assert_eq!(files[0].hunk_headers.len(), 1);
        }

        #[test]
        fn empty_input() {
            assert!(get_hunk_headers_str("").unwrap().is_empty());
        }
    }
}
