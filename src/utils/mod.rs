pub mod error;
pub mod extract;
pub mod logging;
pub mod string_utils;

pub use error::*;
pub use extract::{AppJson, AppPath, AppQuery};
pub use string_utils::{non_empty, truncate_chars, truncate_safe, truncate_with_suffix};
