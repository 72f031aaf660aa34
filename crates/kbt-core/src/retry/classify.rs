//! Classify HTTP status and curl errors into fetch error kinds.

use super::error::FetchErrorKind;

/// Classify a non-2xx HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> FetchErrorKind {
    let status = u16::try_from(code).unwrap_or(u16::MAX);
    match code {
        408 | 429 => FetchErrorKind::Server(status),
        500..=599 => FetchErrorKind::Server(status),
        _ => FetchErrorKind::Rejected(status),
    }
}

/// Classify a curl error for retry decisions.
///
/// `cancelled` is whether the caller's cancellation signal was set when the
/// transfer stopped; an aborted-by-callback error is only `Cancelled` then.
pub fn classify_curl_error(e: &curl::Error, cancelled: bool) -> FetchErrorKind {
    if e.is_aborted_by_callback() && cancelled {
        return FetchErrorKind::Cancelled;
    }
    if e.is_operation_timedout() {
        return FetchErrorKind::Timeout;
    }
    FetchErrorKind::Connection
}
