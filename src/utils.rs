use rand::Rng;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Truncates a string to a maximum display width, appending an ellipsis
/// (`…`) when it was cut. Operates on Unicode grapheme clusters, so multi
/// codepoint emoji and combining characters survive intact.
///
/// # Panics
///
/// Panics if `max_width` is less than 2 (no room for the ellipsis).
pub fn truncate_message(message: &str, max_width: usize) -> String {
    assert!(
        max_width >= 2,
        "max_width must be at least 2 to accommodate the ellipsis"
    );

    let graphemes: Vec<&str> = message.graphemes(true).collect();

    if graphemes.len() > max_width {
        format!("{}…", graphemes[..max_width - 1].concat())
    } else {
        message.to_string()
    }
}

/// Generates a random number with exactly `length` digits, used to build
/// cache-busting `?ts=` query values.
///
/// # Panics
///
/// Panics if `length` is 0 or larger than 19 (would not fit in a `u64`).
pub fn generate_random_number(length: u32) -> u64 {
    assert!(length > 0, "length must be greater than 0");
    assert!(length <= 19, "length must be at most 19 to fit in u64");
    let range = 10u64.pow(length - 1)..10u64.pow(length);
    rand::rng().random_range(range)
}

/// Validates a basic HTTP authentication string in the format
/// `username:password`.
///
/// # Errors
///
/// Returns an error message when the separator is missing or either side is
/// empty.
pub fn validate_basic_auth(val: &str) -> Result<String, String> {
    if val.contains(':') {
        let parts: Vec<&str> = val.splitn(2, ':').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            Ok(val.to_string())
        } else {
            Err(String::from(
                "Invalid format: must be `username:password` with non-empty values",
            ))
        }
    } else {
        Err(String::from("Invalid format: must be `username:password`"))
    }
}

pub fn kb(bytes: usize) -> String {
    let kilobytes = bytes as f64 / 1024.0;
    format!("{kilobytes:.2}kb")
}

pub fn percent(percent: f64) -> String {
    format!("{percent:.0}%")
}

pub fn ms(duration: Duration) -> String {
    let milliseconds = duration.as_millis() as f64;
    format!("{milliseconds:.2}ms")
}
