//! Network URL constants and realtime endpoint construction.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Path of the realtime endpoint on the API host.
pub const REALTIME_PATH: &str = "/ws";

/// Derive the realtime base URL from an HTTP base URL.
///
/// `https://host` becomes `wss://host/ws`, anything else `ws://host/ws`. Any
/// path on the base URL is dropped; the realtime endpoint lives at the host root.
pub fn derive_ws_url(base_url: &str) -> String {
    let (scheme, rest) = match base_url.split_once("://") {
        Some(("https", rest)) => ("wss", rest),
        Some((_, rest)) => ("ws", rest),
        None => ("ws", base_url),
    };
    let host = rest.split('/').next().unwrap_or(rest);
    format!("{}://{}{}", scheme, host, REALTIME_PATH)
}

/// Build the connection target for a session.
///
/// The realtime transport cannot carry headers, so the credential travels as
/// the `token` query parameter.
pub fn realtime_url(ws_url: &str, token: &str) -> String {
    let separator = if ws_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}token={}",
        ws_url,
        separator,
        urlencoding::encode(token)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_ws_url_https() {
        assert_eq!(
            derive_ws_url("https://blotter.example.com"),
            "wss://blotter.example.com/ws"
        );
    }

    #[test]
    fn test_derive_ws_url_http_with_path() {
        assert_eq!(
            derive_ws_url("http://localhost:8000/api/"),
            "ws://localhost:8000/ws"
        );
    }

    #[test]
    fn test_realtime_url_encodes_token() {
        assert_eq!(
            realtime_url("ws://localhost:8000/ws", "a b+c/="),
            "ws://localhost:8000/ws?token=a%20b%2Bc%2F%3D"
        );
    }

    #[test]
    fn test_realtime_url_existing_query() {
        assert_eq!(
            realtime_url("ws://h/ws?v=1", "t"),
            "ws://h/ws?v=1&token=t"
        );
    }
}
