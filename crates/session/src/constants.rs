//! Backend and storage constants
//!
//! Key names match the ones the storefront web app keeps in browser storage,
//! so a credential file can be shared with tooling that mirrors it.

/// Store key holding the bearer access token
pub const ACCESS_TOKEN_KEY: &str = "authToken";

/// Store key holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Store key holding the JSON-encoded user profile returned at login
pub const USER_DATA_KEY: &str = "userData";

/// Every key that belongs to a login session. Cleared together on logout
/// and on unrecoverable refresh failure.
pub const SESSION_KEYS: &[&str] = &[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY];

/// Refresh endpoint, relative to the API base URL
pub const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";

/// API root used when nothing is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8088/api/v1";

/// Unauthenticated entry point the user is sent to when the session is lost
pub const DEFAULT_LOGIN_PATH: &str = "/authenticate";
