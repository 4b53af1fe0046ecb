//! Error types for the pagination cache.

use thiserror::Error;

/// Errors returned when reading pages from a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session has no stored results, or does not exist (or expired).
    #[error("no cached query results, run a search first")]
    NoResults,

    #[error("page index {page_index} is out of range ({total_pages} pages available)")]
    PageOutOfRange {
        page_index: usize,
        total_pages: usize,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reports_bounds() {
        let error = SessionError::PageOutOfRange {
            page_index: 3,
            total_pages: 3,
        };
        assert_eq!(
            error.to_string(),
            "page index 3 is out of range (3 pages available)"
        );
    }
}
