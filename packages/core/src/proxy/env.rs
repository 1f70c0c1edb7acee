//! Proxy settings from the process environment

use std::net::IpAddr;

use url::Url;

use super::ProxyResolver;
use super::no_proxy::NoProxy;
use crate::error::BoxError;

/// Resolves proxies the way most HTTP clients read the environment.
///
/// `HTTP_PROXY` applies to cleartext attempts and `HTTPS_PROXY` to TLS
/// attempts (upper case first, then lower case). Hosts listed in `NO_PROXY`
/// and loopback hosts are always dialed directly.
#[derive(Debug, Clone, Default)]
pub struct EnvProxy {
    http: Option<Url>,
    https: Option<Url>,
    no_proxy: Option<NoProxy>,
}

impl EnvProxy {
    pub fn from_env() -> Self {
        Self {
            http: proxy_var("HTTP_PROXY", "http_proxy"),
            https: proxy_var("HTTPS_PROXY", "https_proxy"),
            no_proxy: NoProxy::from_env(),
        }
    }

    pub fn from_parts(http: Option<Url>, https: Option<Url>, no_proxy: Option<NoProxy>) -> Self {
        Self {
            http,
            https,
            no_proxy,
        }
    }
}

impl ProxyResolver for EnvProxy {
    fn proxy_for(&self, target: &Url) -> Result<Option<Url>, BoxError> {
        let Some(host) = target.host_str() else {
            return Ok(None);
        };
        if is_loopback(host) {
            return Ok(None);
        }
        if let Some(no_proxy) = &self.no_proxy
            && no_proxy.matches(host)
        {
            return Ok(None);
        }

        let proxy = match target.scheme() {
            "http" => self.http.clone(),
            "https" => self.https.clone(),
            _ => None,
        };
        Ok(proxy)
    }
}

fn proxy_var(upper: &str, lower: &str) -> Option<Url> {
    let raw = std::env::var(upper).or_else(|_| std::env::var(lower)).ok()?;
    match parse_proxy_url(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(variable = upper, "ignoring invalid proxy URL: {e}");
            None
        }
    }
}

/// Parses a proxy URL, assuming `http://` when no scheme is given.
pub fn parse_proxy_url(raw: &str) -> Result<Url, url::ParseError> {
    let raw = raw.trim();
    if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("http://{raw}"))
    }
}

fn is_loopback(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    bare.eq_ignore_ascii_case("localhost")
        || bare.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> EnvProxy {
        EnvProxy::from_parts(
            Some(parse_proxy_url("proxy.corp:3128").unwrap()),
            Some(parse_proxy_url("http://secure-proxy.corp:8080").unwrap()),
            NoProxy::from_string("internal.example"),
        )
    }

    #[test]
    fn scheme_selects_proxy() {
        let resolver = resolver();
        let http = resolver
            .proxy_for(&Url::parse("http://control.example:80/switch").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(http.host_str(), Some("proxy.corp"));
        assert_eq!(http.port(), Some(3128));

        let https = resolver
            .proxy_for(&Url::parse("https://control.example:443/switch").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(https.host_str(), Some("secure-proxy.corp"));
    }

    #[test]
    fn bypass_rules_and_loopback_are_direct() {
        let resolver = resolver();
        for target in [
            "http://api.internal.example/switch",
            "http://localhost:8080/switch",
            "http://127.0.0.1:8080/switch",
            "https://[::1]:443/switch",
        ] {
            let url = Url::parse(target).unwrap();
            assert_eq!(resolver.proxy_for(&url).unwrap(), None, "{target}");
        }
    }
}
