//! Shared constants for end-to-end tests

// ============================================================================
// Server lifecycle
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Body limit of the test server.
pub const TEST_MAX_UPLOAD_BYTES: usize = 256 * 1024;

// ============================================================================
// Reference data seeded into every test database
// ============================================================================

/// Item with parts, values and a reusable part.
pub const BOTTLE: &str = "bottle";

/// Item with one part and nothing else.
pub const CAN: &str = "can";

/// Item the database knows nothing about.
pub const LAPTOP: &str = "laptop";

pub const RECYCLING_CENTER_NAME: &str = "Green Hub";

pub const RESALE_AREA_NAME: &str = "Second Life Store";
