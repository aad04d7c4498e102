//! DSN parsing
//!
//! `driver:key=value;key=value` strings, as accepted by `PDO::__construct`.
//! The mock only reads the driver prefix and the version keys from them.

use super::error::PdoError;

/// Driver names the mock can impersonate
pub const AVAILABLE_DRIVERS: &[&str] = &["mock"];

/// `PDO::getAvailableDrivers()`
pub fn available_drivers() -> Vec<String> {
    AVAILABLE_DRIVERS.iter().map(|d| d.to_string()).collect()
}

/// Parse a DSN string into driver name and connection string
/// Format: "driver:connection_string"
pub fn parse_dsn(dsn: &str) -> Result<(&str, &str), PdoError> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return Err(PdoError::InvalidArgument(
            "Invalid DSN format: empty DSN".to_string(),
        ));
    }

    match dsn.find(':') {
        Some(colon_pos) => {
            let driver = dsn[..colon_pos].trim();
            if driver.is_empty() {
                return Err(PdoError::InvalidArgument(
                    "Invalid DSN format: empty driver name".to_string(),
                ));
            }
            Ok((driver, &dsn[colon_pos + 1..]))
        }
        None => Err(PdoError::InvalidArgument(
            "Invalid DSN format: expected 'driver:connection_string'".to_string(),
        )),
    }
}

pub fn parse_semicolon_kv(s: &str) -> impl Iterator<Item = (&str, &str)> {
    s.split(';').filter_map(|part| {
        let mut it = part.splitn(2, '=');
        let key = it.next()?.trim();
        let value = it.next()?.trim();
        if key.is_empty() {
            None
        } else {
            Some((key, value))
        }
    })
}

/// Look up a key in a connection string, case-insensitively
pub fn dsn_option<'a>(conn_str: &'a str, key: &str) -> Option<&'a str> {
    parse_semicolon_kv(conn_str)
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}
