//! Shared constants

/// Maximum number of IDs sent to an entity lookup endpoint at once
pub const DATA_BATCH_SIZE: usize = 500;

/// Default page size for numbered-offset queries
pub const PAGINATION_LIMIT: u64 = 100;

/// Page size for scroll-based device queries
pub const SCROLL_BATCH_SIZE: u64 = 5000;

/// Page size for host group queries
pub const HOST_GROUP_SCROLL_BATCH_SIZE: u64 = 100;

/// Maximum number of IDs per device action request
pub const DEVICE_ACTION_BATCH_SIZE: usize = 100;

pub use caracara_filters::PLATFORMS;

/// Default comment attached to actions that accept one
pub const DEFAULT_COMMENT: &str = "This action was performed by the Caracara library.";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("crowdstrike-caracara/", env!("CARGO_PKG_VERSION"));

/// Upper bound on concurrent requests issued by a single operation
pub const MAX_PULL_CONCURRENCY: usize = 20;

/// Number of concurrent requests used for paginated and batched pulls.
///
/// Twice the available cores, capped at [`MAX_PULL_CONCURRENCY`].
pub fn pull_concurrency() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores * 2).min(MAX_PULL_CONCURRENCY)
}
