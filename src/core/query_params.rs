use std::borrow::Cow;
use std::collections::HashMap;

/// Decoded `key=value` pairs from the query part of `uri`.
///
/// Repeated keys keep the last value; a bare key maps to an empty string.
/// Undecodable values are kept as sent.
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let Some((_, query)) = uri.split_once('?') else {
        return HashMap::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned)
}

/// The value under `key`, treating an empty value as missing.
pub fn non_empty_param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_values() {
        let params = parse_query_params("/posts?user=a%2Db&flag&user%20id=x");
        assert_eq!(params.get("user").map(String::as_str), Some("a-b"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
        assert_eq!(params.get("user id").map(String::as_str), Some("x"));
    }

    #[test]
    fn last_value_wins_and_empty_is_missing() {
        let params = parse_query_params("/posts?user=first&user=second&blank=");
        assert_eq!(non_empty_param(&params, "user"), Some("second"));
        assert_eq!(non_empty_param(&params, "blank"), None);
        assert_eq!(non_empty_param(&params, "page"), None);
    }

    #[test]
    fn no_query_string() {
        assert!(parse_query_params("/posts").is_empty());
        assert!(parse_query_params("/posts?").is_empty());
        assert!(parse_query_params("/posts?&&").is_empty());
    }
}
