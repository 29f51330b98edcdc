use crate::config::CatalogSettings;
use crate::error::{Result, SpeedtestError};
use crate::types::{Coordinate, Server, ServerCatalog};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

// speedtest.net 静态服务器列表:
// <settings><servers><server url=".." lat=".." lon=".." id=".." .../></servers></settings>
#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    servers: RawServerList,
}

#[derive(Debug, Default, Deserialize)]
struct RawServerList {
    #[serde(default)]
    server: Vec<RawServer>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@url", default)]
    url: String,
    #[serde(rename = "@url2", default)]
    url2: String,
    #[serde(rename = "@lat", default)]
    lat: String,
    #[serde(rename = "@lon", default)]
    lon: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@country", default)]
    country: String,
    #[serde(rename = "@cc", default)]
    cc: String,
    #[serde(rename = "@sponsor", default)]
    sponsor: String,
    #[serde(rename = "@host", default)]
    host: String,
}

impl RawServer {
    fn into_server(self) -> Server {
        Server {
            coordinate: Coordinate::parse_lossy(&self.lat, &self.lon),
            id: self.id,
            name: self.name,
            country: self.country,
            country_code: self.cc,
            sponsor: self.sponsor,
            host: self.host,
            url: self.url,
            url2: self.url2,
            distance_km: 0.0,
        }
    }
}

/// Parses a server list document. Malformed numeric attributes become 0.0;
/// only a structurally broken document is an error.
pub fn parse_catalog(body: &str) -> Result<Vec<Server>> {
    let doc: RawDocument = quick_xml::de::from_str(body)?;
    Ok(doc
        .servers
        .server
        .into_iter()
        .map(RawServer::into_server)
        .collect())
}

/// Fetches the server catalog from a primary source with a secondary mirror.
pub struct Directory {
    client: Client,
    primary: String,
    secondary: String,
}

impl Directory {
    pub fn new(client: Client, settings: &CatalogSettings) -> Self {
        Self::with_sources(client, &settings.primary, &settings.secondary)
    }

    pub fn with_sources(client: Client, primary: &str, secondary: &str) -> Self {
        Self {
            client,
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        }
    }

    /// 获取服务器列表并按与调用者的距离排序
    ///
    /// 逻辑:
    /// 1. 请求主源; 失败、空响应或没有服务器时改用备用源
    /// 2. 两个源都不可用时返回 DirectoryUnavailable, 同时保留两次失败原因
    /// 3. 计算距离并稳定排序
    pub async fn fetch_catalog(&self, caller: Coordinate) -> Result<ServerCatalog> {
        let servers = match self.fetch_servers(&self.primary).await {
            Ok(servers) => servers,
            Err(primary_err) => {
                warn!(
                    "Primary server list unusable ({}), retrying with {}",
                    primary_err, self.secondary
                );
                self.fetch_servers(&self.secondary)
                    .await
                    .map_err(|secondary_err| SpeedtestError::DirectoryUnavailable {
                        primary: primary_err.to_string(),
                        secondary: secondary_err.to_string(),
                    })?
            }
        };

        let catalog = ServerCatalog::from_servers(caller, servers);
        info!("Fetched {} servers", catalog.len());
        Ok(catalog)
    }

    async fn fetch_servers(&self, url: &str) -> Result<Vec<Server>> {
        debug!("Fetching server list from {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if body.trim().is_empty() {
            return Err(SpeedtestError::Custom(format!("empty response body from {}", url)));
        }

        let servers = parse_catalog(&body)?;
        if servers.is_empty() {
            return Err(SpeedtestError::Custom(format!("no servers listed by {}", url)));
        }
        Ok(servers)
    }
}
