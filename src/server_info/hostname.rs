use std::net::IpAddr;

use crate::error::ConfigError;

/// Normalizes a server name to the ASCII form used as its cache file name.
///
/// IP literals are kept in their canonical form. Other names follow DNS
/// rules: internationalized labels are converted to punycode, letters are
/// lower-cased and a trailing root dot is dropped. The result is always a
/// single path component.
pub fn to_ascii(server: &str) -> Result<String, ConfigError> {
    let trimmed = server.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(ConfigError::MissingServer);
    }

    let literal = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    if let Ok(addr) = literal.parse::<IpAddr>() {
        return Ok(addr.to_string());
    }

    let ascii = idna::domain_to_ascii(trimmed)
        .map_err(|e| ConfigError::invalid_hostname(server, e.to_string()))?;

    if let Some(bad) = ascii
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ConfigError::invalid_hostname(
            server,
            format!("character {bad:?} is not allowed in a host name"),
        ));
    }
    if ascii.split('.').any(str::is_empty) {
        return Err(ConfigError::invalid_hostname(server, "empty label"));
    }

    Ok(ascii)
}
