//! Target validation: usable address or hostname vs. noise.
//!
//! Values routed into a target field are not always targets. Epoch
//! timestamps in particular (`1693766400000`) are all digits and would
//! otherwise pass as a numeric hostname.
//!
//! Only these IPv6 forms are accepted: full eight-group form, `::`,
//! `::<group>`, and `<groups>::<group>`.

use once_cell::sync::Lazy;
use regex::Regex;

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10,}$").expect("valid regex"));

static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .expect("valid regex")
});

static IPV6: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$|^::$|^::[0-9a-fA-F]{1,4}$|^(?:[0-9a-fA-F]{1,4}:)+:[0-9a-fA-F]{1,4}$",
    )
    .expect("valid regex")
});

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid regex")
});

const MAX_HOSTNAME_LEN: usize = 253;

/// Whether `target` is an IPv4/IPv6 literal or a plausible hostname.
pub fn is_valid_target(target: &str) -> bool {
    if target.is_empty() || TIMESTAMP.is_match(target) {
        return false;
    }

    if IPV4.is_match(target) || IPV6.is_match(target) {
        return true;
    }

    if target.len() > MAX_HOSTNAME_LEN || !HOSTNAME.is_match(target) {
        return false;
    }

    let has_letter_or_dot = target.chars().any(|c| c.is_ascii_alphabetic() || c == '.');
    let all_digits = target.chars().all(|c| c.is_ascii_digit());
    has_letter_or_dot && !all_digits
}

/// Keep the valid targets, in order. Invalid entries are dropped with a warning.
pub fn filter_valid_targets(targets: &[String]) -> Vec<String> {
    targets
        .iter()
        .filter(|target| {
            let valid = is_valid_target(target);
            if !valid {
                tracing::warn!(host = %target, "Invalid target filtered out");
            }
            valid
        })
        .cloned()
        .collect()
}
