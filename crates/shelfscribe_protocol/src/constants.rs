//! Canonical default values shared across the HTTP surface, Session, and drivers.
//!
//! Mirrors the teacher's `casparian_protocol::defaults` module: one place for every
//! compile-time constant the spec pins a literal value to.

use std::time::Duration;

/// Auth token lifetime (`T_AUTH`).
pub const AUTH_TOKEN_LIFETIME: Duration = Duration::from_secs(2 * 60 * 60);
/// Window before expiry during which a refresh is accepted (`T_REFRESH`).
pub const AUTH_REFRESH_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Rate limiter: requests allowed per window.
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 10;
/// Rate limiter: window length.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Negative cache entry TTL.
pub const NEGATIVE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// LLM CSV-parse cache TTL.
pub const CSV_PARSE_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Delay before a terminal job cleanup alarm fires.
pub const CLEANUP_ALARM_DELAY: Duration = Duration::from_secs(24 * 60 * 60);
/// Delay before the CSV-parse alarm fires, to let the client connect its socket.
pub const CSV_PARSE_ALARM_DELAY: Duration = Duration::from_secs(2);
/// How long `WaitForReady` blocks before giving up.
pub const READY_TIMEOUT: Duration = Duration::from_secs(5);
/// Non-fatal wait for a ready signal inside the CSV alarm handler.
pub const CSV_READY_GRACE: Duration = Duration::from_secs(10);
/// Delay between a terminal `SendComplete`/`SendError` and closing the socket.
pub const SEND_CLOSE_FLUSH_DELAY: Duration = Duration::from_secs(1);

/// Default per-provider timeout in `ProviderFanout`.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
/// Default `Enricher` concurrency.
pub const ENRICH_CONCURRENCY: usize = 10;

/// Capacity of a Session's bounded outbound socket queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// Validation limits (§4.G, §7).
pub const MAX_BOOKS_PER_BATCH: usize = 100;
pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_AUTHOR_LEN: usize = 300;
pub const MAX_ISBN_LEN: usize = 17;
pub const MAX_CSV_BYTES: usize = 10 * 1024 * 1024; // 10 MiB
pub const MAX_IMAGES_PER_SCAN: usize = 5;
pub const MAX_IMAGE_DECODED_BYTES: usize = 10_000_000; // 10 MB

pub const WS_PROTOCOL_VERSION: &str = "1.0.0";
