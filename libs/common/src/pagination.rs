//! Lenient `limit`/`skip` handling for listing endpoints
//!
//! Query parameters are parsed the forgiving way: an absent `limit` means
//! 10 and an absent `skip` means 0, while a present but non-numeric value
//! silently becomes 0. A limit of 0 means "no limit".

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: i64 = 10;

/// A window over an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of records, `None` for unbounded
    pub limit: Option<i64>,
    /// Number of leading records to skip
    pub skip: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LIMIT),
            skip: 0,
        }
    }
}

impl Pagination {
    /// Build a pagination window from raw query-string values
    pub fn from_params(limit: Option<&str>, skip: Option<&str>) -> Self {
        let limit = match limit.map(lenient) {
            None => Some(DEFAULT_LIMIT),
            Some(0) => None,
            Some(n) => Some(n),
        };
        let skip = skip.map(lenient).unwrap_or(0);

        Self { limit, skip }
    }

    /// A window returning every record
    pub fn unbounded() -> Self {
        Self {
            limit: None,
            skip: 0,
        }
    }

    /// Apply the window to an already ordered sequence
    pub fn window<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let take = self
            .limit
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        items.into_iter().skip(skip).take(take).collect()
    }
}

/// Non-numeric and negative values coerce to zero
fn lenient(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0).max(0)
}
