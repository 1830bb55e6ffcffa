//! `Set-Cookie` parsing
//!
//! Only the `name=value` pair of each header matters to the connector;
//! attributes (`Path`, `HttpOnly`, `Expires`, ...) are skipped.

use super::types::{SessionToken, SESSION_COOKIE};
use reqwest::header::{HeaderMap, SET_COOKIE};

/// Split a `Set-Cookie` header value into its cookie name and value
pub fn parse_set_cookie(header: &str) -> Option<(&str, &str)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    Some((name, value))
}

/// Find the Hydra session cookie among the response's `Set-Cookie` headers
///
/// When the server sets the cookie more than once, the last one wins.
pub fn extract_session(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(parse_set_cookie)
        .filter(|(name, _)| *name == SESSION_COOKIE)
        .filter_map(|(_, value)| SessionToken::from_cookie_value(value))
        .last()
}

#[cfg(test)]
mod cookie_tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(SET_COOKIE, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_parse_set_cookie() {
        assert_eq!(
            parse_set_cookie("hydra_session=abc; path=/; HttpOnly"),
            Some(("hydra_session", "abc"))
        );
        assert_eq!(parse_set_cookie("a=b"), Some(("a", "b")));
        assert_eq!(parse_set_cookie(" a = \"quoted\" ;x"), Some(("a", "quoted")));
        assert_eq!(parse_set_cookie("novalue"), None);
        assert_eq!(parse_set_cookie("=orphan"), None);
    }

    #[test]
    fn test_extract_session() {
        let token = "0123456789012345678901234567890123456789";
        let map = headers(&[
            "other=1; path=/",
            &format!("hydra_session={token}; path=/; expires=Thu, 01 Jan 2099 00:00:00 GMT; HttpOnly"),
        ]);

        let session = extract_session(&map).unwrap();
        assert_eq!(session.as_str(), token);
    }

    #[test]
    fn test_extract_session_truncates() {
        let value = format!("{}{}", "x".repeat(40), "overflow");
        let map = headers(&[&format!("hydra_session={value}")]);

        let session = extract_session(&map).unwrap();
        assert_eq!(session.as_str(), "x".repeat(40));
    }

    #[test]
    fn test_extract_session_ignores_lookalike_names() {
        let map = headers(&["my_hydra_session=abc", "hydra_session_old=def"]);
        assert!(extract_session(&map).is_none());
    }

    #[test]
    fn test_extract_session_missing() {
        assert!(extract_session(&HeaderMap::new()).is_none());
        assert!(extract_session(&headers(&["hydra_session=; path=/"])).is_none());
    }
}
