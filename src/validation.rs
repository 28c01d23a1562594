/*!
 * Input validation for handle initialization and function calls
 */

use std::net::IpAddr;

use serde::{Deserialize, Deserializer};

use crate::config::ConnectionDetails;
use crate::error::{Error, Result};

/// Check the arguments of `init` before a handle is attached
pub fn validate_init_params(name: &str, details: &ConnectionDetails) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation(
            "parameter \"name\" must be a non-empty string".to_string(),
        ));
    }

    validate_host(&details.host)?;

    if details.database.is_empty() {
        return Err(Error::Validation(
            "\"database\" value must be a non-empty string".to_string(),
        ));
    }

    if details.user.is_empty() {
        return Err(Error::Validation(
            "\"user\" value must be a non-empty string".to_string(),
        ));
    }

    Ok(())
}

/// `localhost` or an IPv4/IPv6 literal
pub fn validate_host(host: &str) -> Result<()> {
    if host == "localhost" || host.parse::<IpAddr>().is_ok() {
        Ok(())
    } else {
        Err(Error::Validation(
            "\"host\" value must be \"localhost\" or an IPv4/IPv6 address".to_string(),
        ))
    }
}

/// Parse a port given as text, e.g. from the command line
pub fn parse_port(value: &str) -> Result<u16> {
    let port: i64 = value
        .trim()
        .parse()
        .map_err(|_| Error::Validation("\"port\" value must be an integer".to_string()))?;
    port_in_range(port)
}

fn port_in_range(port: i64) -> Result<u16> {
    u16::try_from(port).map_err(|_| {
        Error::Validation("\"port\" value must be >= 0 and <= 65535".to_string())
    })
}

/// Serde helper: accept a port as a number or as a numeric string
pub(crate) fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(i64),
        Text(String),
    }

    let port = match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => port_in_range(n),
        PortValue::Text(s) => parse_port(&s),
    };
    port.map_err(serde::de::Error::custom)
}

/// Function names: an identifier, optionally schema-qualified
///
/// Each part starts with an ASCII letter or `_` and continues with ASCII
/// letters, digits, `_` or `$`.
pub fn validate_function_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation(
            "parameter \"name\" must be a non-empty string".to_string(),
        ));
    }

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_identifier(part)) {
        return Err(Error::Validation(format!(
            "parameter \"name\" must be a function identifier, got \"{name}\""
        )));
    }

    Ok(())
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
