//! Limit/offset pagination for detection listings

use bnp_common::{Error, Result};
use serde::Serialize;

/// Default page size for detection listings
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page for general detection listings
pub const MAX_LIMIT: i64 = 500;

/// Default page size for a single species' detections
pub const SPECIES_DEFAULT_LIMIT: i64 = 100;

/// Largest page for a single species' detections
pub const SPECIES_MAX_LIMIT: i64 = 1000;

/// Validated limit/offset pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Validate a requested page
    ///
    /// `limit` must lie in `[1, max_limit]` and `offset` must be non-negative;
    /// anything else is rejected rather than clamped.
    ///
    /// # Examples
    /// ```
    /// use bnp_api::pagination::Page;
    ///
    /// let page = Page::new(50, 100, 500).unwrap();
    /// assert_eq!(page.limit, 50);
    /// assert_eq!(page.offset, 100);
    ///
    /// assert!(Page::new(0, 0, 500).is_err());
    /// assert!(Page::new(501, 0, 500).is_err());
    /// assert!(Page::new(10, -1, 500).is_err());
    /// ```
    pub fn new(limit: i64, offset: i64, max_limit: i64) -> Result<Self> {
        if limit < 1 || limit > max_limit {
            return Err(Error::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                max_limit, limit
            )));
        }
        if offset < 0 {
            return Err(Error::InvalidInput(format!(
                "offset must be >= 0, got {}",
                offset
            )));
        }
        Ok(Self { limit, offset })
    }
}
