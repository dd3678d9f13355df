//! parser
//!
//! Parsers for git text output.
//!
//! - [`diff_headers`] - file and hunk headers of unified diffs

pub mod diff_headers;

pub use diff_headers::{
    get_hunk_headers, get_hunk_headers_str, parse_diff_file_header, parse_diff_hunk_header,
    ParseError,
};
