use std::net::IpAddr;
use std::time::Duration;

use kiosk_core::error::AppError;
use kiosk_core::traits::Fetcher;
use reqwest::Client;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP fetcher using reqwest.
///
/// Downloads the raw body of a source URL as text. Since source URLs are
/// user-authored and re-fetched unattended on a timer, requests to
/// private/reserved IP ranges are blocked by default; a daemon on a laptop
/// can opt out with [`allow_private_urls`](Self::allow_private_urls) to
/// poll hosts on the local network.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    block_private_hosts: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("kiosk/0.1 (feed reader)")
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            block_private_hosts: true,
        })
    }

    /// Permit requests to private/reserved addresses.
    pub fn allow_private_urls(mut self) -> Self {
        self.block_private_hosts = false;
        self
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if self.block_private_hosts {
            reject_private_hosts(url).await?;
        }

        tracing::debug!(url, "Fetching source");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

/// Reject URLs whose host is (or resolves to) a private/reserved address,
/// and anything that is not plain http(s).
async fn reject_private_hosts(url: &str) -> Result<(), AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::HttpError(format!(
            "URL scheme '{}' is not allowed (only http/https)",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::HttpError("URL has no host".to_string()))?;

    // IP literal: no DNS needed.
    if let Ok(ip) = host.parse::<IpAddr>() {
        return if is_reserved_ip(ip) {
            Err(blocked(host, ip))
        } else {
            Ok(())
        };
    }

    // Hostname: every resolved address must be public.
    let port = parsed
        .port()
        .unwrap_or(if parsed.scheme() == "https" { 443 } else { 80 });
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
        .peekable();

    if addrs.peek().is_none() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }

    for addr in addrs {
        if is_reserved_ip(addr.ip()) {
            return Err(blocked(host, addr.ip()));
        }
    }

    Ok(())
}

fn blocked(host: &str, ip: IpAddr) -> AppError {
    AppError::HttpError(format!(
        "blocked private host: {host} resolves to reserved address {ip}"
    ))
}

/// Loopback, RFC 1918/4193, link-local (incl. cloud metadata), CGN,
/// unspecified, broadcast, documentation ranges.
fn is_reserved_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || (octets[0] == 100 && (octets[1] & 0xC0) == 64) // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // fe80::/10
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // fc00::/7
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_reserved_ip(IpAddr::V4(v4)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ipv4_ranges() {
        for ip in [
            "127.0.0.1",
            "10.0.0.1",
            "172.16.0.1",
            "192.168.1.1",
            "169.254.169.254", // cloud metadata
            "0.0.0.0",
            "100.64.0.1", // CGN
        ] {
            assert!(is_reserved_ip(ip.parse().unwrap()), "{ip}");
        }
    }

    #[test]
    fn test_public_ipv4_allowed() {
        for ip in ["8.8.8.8", "1.1.1.1", "93.184.216.34"] {
            assert!(!is_reserved_ip(ip.parse().unwrap()), "{ip}");
        }
    }

    #[test]
    fn test_reserved_ipv6_ranges() {
        for ip in [
            "::1",
            "::",
            "fe80::1",
            "fc00::1",
            "::ffff:127.0.0.1",
            "::ffff:169.254.169.254",
        ] {
            assert!(is_reserved_ip(ip.parse().unwrap()), "{ip}");
        }
        assert!(!is_reserved_ip("2001:4860:4860::8888".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_private_ip_literal_rejected() {
        let err = reject_private_hosts("http://127.0.0.1/feed").await.unwrap_err();
        assert!(err.to_string().contains("blocked private host"));
    }

    #[tokio::test]
    async fn test_metadata_endpoint_rejected() {
        let err = reject_private_hosts("http://169.254.169.254/latest/meta-data/")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("blocked private host"));
    }

    #[tokio::test]
    async fn test_non_http_scheme_rejected() {
        let err = reject_private_hosts("file:///etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }
}
