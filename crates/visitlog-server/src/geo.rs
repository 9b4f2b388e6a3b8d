//! HTTP geo lookup against an ipapi.co-compatible JSON endpoint.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use visitlog_core::geo::{GeoInfo, GeoLookup};

/// Client for services answering `GET <template with {ip}>` with
/// `{ city, region, country_name, timezone }` and `{ error: true, reason }`
/// on rejection.
pub struct IpApiClient {
    client: reqwest::Client,
    url_template: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    timezone: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

impl IpApiClient {
    /// `url_template` uses `{ip}` as the placeholder, e.g. `https://ipapi.co/{ip}/json/`.
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("visitlog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    fn url_for(&self, ip: &IpAddr) -> String {
        self.url_template.replace("{ip}", &ip.to_string())
    }
}

#[async_trait]
impl GeoLookup for IpApiClient {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        // Forwarded-for values are client-controlled; only real addresses go into the URL.
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| anyhow!("not an IP address: {ip:?}"))?;
        let url = self.url_for(&addr);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("geo service returned {status} for {addr}");
        }

        let body: IpApiResponse = response.json().await?;
        if body.error {
            bail!(
                "geo service rejected {addr}: {}",
                body.reason.as_deref().unwrap_or("no reason given")
            );
        }

        trace!(city = ?body.city, country = ?body.country_name, "geo lookup");

        Ok(GeoInfo {
            city: body.city,
            region: body.region,
            country: body.country_name,
            timezone: body.timezone,
        })
    }

    fn name(&self) -> &'static str {
        "ipapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholder_is_replaced() {
        let client =
            IpApiClient::new("https://ipapi.co/{ip}/json/", Duration::from_secs(1)).expect("client");
        let addr: IpAddr = "2001:db8::1".parse().expect("ip");
        assert_eq!(client.url_for(&addr), "https://ipapi.co/2001:db8::1/json/");
    }

    #[tokio::test]
    async fn non_ip_input_fails_without_a_request() {
        let client =
            IpApiClient::new("http://127.0.0.1:1/{ip}", Duration::from_millis(100)).expect("client");
        let err = client
            .lookup("../admin")
            .await
            .expect_err("path input must be rejected");
        assert!(err.to_string().contains("not an IP address"));
    }
}
