//! Encoding, search and formatting helpers used around the firmware

pub mod base64;
pub mod hex;
pub mod misc;
pub mod strings;
pub mod time;

pub use base64::{encode64, encode64_bytes, encode64_chunk, encode64_truncates, MAX_ENCODE64_INPUT};
pub use hex::{format_hex, list_buff};
pub use misc::{smooth, ProgressDots};
pub use strings::{change_extension, is_sub_array, remove_char, url_decode};
pub use time::{date_format, format_elapsed_time, Clock};
