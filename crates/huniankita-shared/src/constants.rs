/// Application name
pub const APP_NAME: &str = "HunianKita";

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default token cost for uploading a new listing (admin-tunable)
pub const DEFAULT_UPLOAD_COST: i64 = 15;

/// Default token cost for boosting a listing (admin-tunable)
pub const DEFAULT_BOOST_COST: i64 = 15;

/// Token top-up packages offered on the pricing page
pub const TOKEN_PACKAGES: [i64; 5] = [15, 30, 75, 150, 330];

/// How long a boost keeps a listing elevated
pub const BOOST_WINDOW_DAYS: i64 = 7;

/// Default page size for listing queries
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Hard cap on page size, whatever the client asks for
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum listing photo size in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Bearer token lifetime in days
pub const TOKEN_LIFETIME_DAYS: i64 = 30;
