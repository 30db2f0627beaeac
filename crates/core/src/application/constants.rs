// Application constants (no magic values)
use std::time::Duration;

/// Attempts per cursor transaction before giving up with AllocationConflict
pub const DEFAULT_MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// Backoff after the first conflicting attempt (doubles per attempt)
pub const DEFAULT_TRANSACTION_BASE_BACKOFF: Duration = Duration::from_millis(10);

/// Upper bound for a single backoff sleep
pub const MAX_TRANSACTION_BACKOFF: Duration = Duration::from_millis(500);
