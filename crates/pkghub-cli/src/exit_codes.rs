//! Process exit codes
//!
//! Follow Unix conventions where applicable.

/// Operation completed without errors
pub const SUCCESS: i32 = 0;

/// Unspecified failure
pub const ERROR: i32 = 1;

/// Invalid input (kind, name, url, credentials)
pub const VALIDATION_ERROR: i32 = 2;

/// Repository, user or organization not found
pub const NOT_FOUND: i32 = 3;

/// Caller may not perform the operation
pub const PERMISSION_DENIED: i32 = 4;

/// File not found, permission denied on disk, etc.
pub const IO_ERROR: i32 = 5;

/// Name already taken
pub const CONFLICT: i32 = 6;

/// Remote repository could not be reached or read
pub const TRANSPORT_ERROR: i32 = 7;

/// Interrupted by the user
pub const CANCELED: i32 = 130;
