pub mod file_utils;
pub mod log_setup;
pub mod parallel;

pub fn is_debug() -> bool {
    cfg!(debug_assertions)
}
