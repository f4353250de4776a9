/// Application name
pub const APP_NAME: &str = "Civic";

/// Maximum issue content length, in characters
pub const MAX_ISSUE_CONTENT_CHARS: usize = 500;

/// Maximum comment content length, in characters
pub const MAX_COMMENT_CONTENT_CHARS: usize = 500;

/// Display name substituted for the author of anonymous content
pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous";

/// Offset (hours east of UTC) at which resolution timestamps are stored
pub const DEFAULT_RESOLUTION_UTC_OFFSET_HOURS: i32 = 2;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Upper bound on `amount` for paged issue listings
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Upper bound on pooled SQLite connections
pub const DEFAULT_DB_MAX_CONNECTIONS: usize = 8;

/// Length in bytes of a session token before hex encoding
pub const SESSION_TOKEN_BYTES: usize = 32;
