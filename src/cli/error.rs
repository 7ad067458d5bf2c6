// Exit codes for scripts and the browser hand-off
pub const SUCCESS: i32 = 0;
pub const ERROR: i32 = 1;
pub const NOT_FOUND: i32 = 2;
pub const INVALID_INPUT: i32 = 3;

/// Exit code for a failed command
pub fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<crate::Error>() {
        Some(crate::Error::NotFound { .. }) => NOT_FOUND,
        Some(crate::Error::SearchUnsupported { .. }) => INVALID_INPUT,
        _ => ERROR,
    }
}
