//! Convert `io::Error` values raised by the file helpers into `MiniJinja`
//! `InvalidOperation` errors that name the action and the relative path.
use std::io::{self, ErrorKind as IoErrorKind};

use camino::Utf8Path;
use minijinja::{Error, ErrorKind};

pub(super) fn io_to_error(path: &Utf8Path, action: &str, err: io::Error) -> Error {
    let io_kind = err.kind();
    let label = io_error_kind_label(io_kind);
    let detail = err.to_string();

    let message = if detail.is_empty() || detail.eq_ignore_ascii_case(label) {
        format!("cannot {action} '{path}': {label}")
    } else {
        format!("cannot {action} '{path}': {label} ({detail})")
    };

    Error::new(ErrorKind::InvalidOperation, message).with_source(err)
}

const fn io_error_kind_label(kind: IoErrorKind) -> &'static str {
    match kind {
        IoErrorKind::NotFound => "not found",
        IoErrorKind::PermissionDenied => "permission denied or outside the base directory",
        IoErrorKind::InvalidInput => "invalid path",
        IoErrorKind::InvalidData => "not valid UTF-8",
        IoErrorKind::IsADirectory => "is a directory",
        IoErrorKind::UnexpectedEof => "unexpected end of file",
        IoErrorKind::Interrupted => "interrupted",
        IoErrorKind::FileTooLarge => "file too large",
        _ => "io error",
    }
}
