use std::str::FromStr;

/// Read an environment variable, treating empty values as unset.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse an optional raw value, falling back to `default` when it is missing or malformed.
pub fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    match value.map(|raw| raw.parse()) {
        Some(Ok(parsed)) => parsed,
        _ => default,
    }
}

pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    parse_or(env_var(key), default)
}
