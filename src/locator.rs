use crate::error::{Result, SpeedtestError};
use crate::traits::Locator;
use crate::types::{Coordinate, UserInfo};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

// speedtest.net 客户端配置: <settings><client ip=".." lat=".." lon=".." isp=".."/>...</settings>
#[derive(Debug, Deserialize)]
struct RawConfig {
    client: RawClient,
}

#[derive(Debug, Deserialize)]
struct RawClient {
    #[serde(rename = "@ip", default)]
    ip: String,
    #[serde(rename = "@lat", default)]
    lat: String,
    #[serde(rename = "@lon", default)]
    lon: String,
    #[serde(rename = "@isp", default)]
    isp: String,
}

pub fn parse_client_config(body: &str) -> Result<UserInfo> {
    let config: RawConfig = quick_xml::de::from_str(body)?;
    let client = config.client;
    Ok(UserInfo {
        coordinate: Coordinate::parse_lossy(&client.lat, &client.lon),
        ip: client.ip,
        isp: client.isp,
    })
}

/// Looks the caller up through the speedtest.net client configuration document.
pub struct HttpLocator {
    client: Client,
    url: String,
}

impl HttpLocator {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Locator for HttpLocator {
    async fn locate(&self) -> Result<UserInfo> {
        debug!("Fetching client configuration from {}", self.url);
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if body.trim().is_empty() {
            return Err(SpeedtestError::Custom(format!(
                "empty client configuration from {}",
                self.url
            )));
        }
        parse_client_config(&body)
    }
}

/// Fixed caller position, e.g. from `--lat/--lon`.
pub struct StaticLocator {
    coordinate: Coordinate,
}

impl StaticLocator {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl Locator for StaticLocator {
    async fn locate(&self) -> Result<UserInfo> {
        Ok(UserInfo {
            ip: "n/a".to_string(),
            isp: "manual location".to_string(),
            coordinate: self.coordinate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONFIG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<settings>
<client ip="203.0.113.7" lat="52.5200" lon="13.4050" isp="Example Telecom" isprating="3.7" rating="0" ispdlavg="0" ispulavg="0" loggedin="0" country="DE" />
<server-config threadcount="4" ignoreids="1,2,3" notonmap="" forcepingid="" preferredserverid=""/>
</settings>"#;

    #[test]
    fn test_parse_client_config() -> Result<()> {
        let user = parse_client_config(CONFIG_XML)?;
        assert_eq!(user.ip, "203.0.113.7");
        assert_eq!(user.isp, "Example Telecom");
        assert_eq!(user.coordinate, Coordinate::new(52.52, 13.405));
        assert_eq!(
            user.to_string(),
            "Testing From IP: 203.0.113.7 (Example Telecom) [52.5200, 13.4050]"
        );
        Ok(())
    }

    #[test]
    fn test_malformed_coordinates_degrade_to_origin() -> Result<()> {
        let user = parse_client_config(r#"<settings><client ip="1.1.1.1" lat="?" lon="" isp="x"/></settings>"#)?;
        assert_eq!(user.coordinate, Coordinate::new(0.0, 0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_http_locator() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/speedtest-config.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CONFIG_XML))
            .mount(&server)
            .await;

        let locator = HttpLocator::new(
            Client::new(),
            &format!("{}/speedtest-config.php", server.uri()),
        );
        let user = locator.locate().await?;
        assert_eq!(user.ip, "203.0.113.7");
        Ok(())
    }

    #[tokio::test]
    async fn test_static_locator() -> Result<()> {
        let user = StaticLocator::new(Coordinate::new(1.5, -2.5)).locate().await?;
        assert_eq!(user.coordinate, Coordinate::new(1.5, -2.5));
        Ok(())
    }
}
