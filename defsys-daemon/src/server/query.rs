//! Query string parsing for the tree endpoint.
//!
//! Lists are sent as repeated keys (`systems=RM&systems=BREX&subtree=3`),
//! which the stock `Query` extractor does not collect, so the raw query is
//! decoded here.

use defsys_core::TreeRequest;

use super::error::ApiError;

fn decode(component: &str) -> Result<String, ApiError> {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|_| ApiError::WrongParameters)
}

/// Parse a boolean the way form frameworks usually do.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Build a [`TreeRequest`] from the raw query string.
///
/// Unknown keys are ignored. A `subtree` value that is not an integer or an
/// `MLST` value that is not a boolean rejects the request.
pub fn parse_tree_query(raw: Option<&str>) -> Result<TreeRequest, ApiError> {
    let mut request = TreeRequest::default();

    for pair in raw.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(key)?;
        let value = decode(value)?;

        match key.as_str() {
            "systems" => request.systems.push(value),
            "subtree" => {
                let index = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::WrongParameters)?;
                request.subtree.push(index);
            }
            "MLST" => request.mlst = parse_flag(&value).ok_or(ApiError::WrongParameters)?,
            _ => {}
        }
    }

    Ok(request)
}
