pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Report name used when the source XML does not declare one.
pub const DEFAULT_REPORT_NAME: &str = "Test Results";

/// Upper bound on the persisted recently-opened-files list.
pub const MAX_RECENT_FILES: usize = 10;
