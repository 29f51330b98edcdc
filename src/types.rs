use crate::geo;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 地理坐标 (单位: 度)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a coordinate from textual degrees. Unparseable values become 0.0.
    pub fn parse_lossy(latitude: &str, longitude: &str) -> Self {
        Self {
            latitude: parse_f64_lossy("lat", latitude),
            longitude: parse_f64_lossy("lon", longitude),
        }
    }
}

/// Parses a numeric field, degrading to 0.0 with a warning instead of failing.
pub fn parse_f64_lossy(field: &str, raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            warn!("Malformed numeric field {}={:?}, using 0.0", field, raw);
            0.0
        }
    }
}

/// 一个测速服务器
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub country: String,
    pub country_code: String,
    pub sponsor: String,
    pub host: String,
    pub url: String,  // 主测速地址, 例如 "http://host:8080/speedtest/upload.php"
    pub url2: String, // 备用地址, 可能为空
    pub coordinate: Coordinate,
    /// Distance from the caller, filled in once when the catalog is built.
    pub distance_km: f64,
}

impl Server {
    /// Catalog ids are textual; selection input is numeric.
    pub fn numeric_id(&self) -> Option<u32> {
        self.id.trim().parse().ok()
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>4}] {:>8.2}km {} ({}) by {}",
            self.id, self.distance_km, self.name, self.country, self.sponsor
        )
    }
}

/// Servers ordered by ascending distance from the caller.
#[derive(Debug, Clone, Default)]
pub struct ServerCatalog {
    servers: Vec<Server>,
}

impl ServerCatalog {
    /// Annotates every server with its distance from `caller` and ranks them.
    pub fn from_servers(caller: Coordinate, mut servers: Vec<Server>) -> Self {
        for server in servers.iter_mut() {
            server.distance_km = geo::distance(caller, server.coordinate);
        }

        // sort_by 是稳定排序: 距离相同时保持文档中的原始顺序
        servers.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        Self { servers }
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn nearest(&self) -> Option<&Server> {
        self.servers.first()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Server> {
        self.servers.iter()
    }
}

/// Caller identity as reported by a locator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserInfo {
    pub ip: String,
    pub isp: String,
    pub coordinate: Coordinate,
}

impl fmt::Display for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Testing From IP: {} ({}) [{:.4}, {:.4}]",
            self.ip, self.isp, self.coordinate.latitude, self.coordinate.longitude
        )
    }
}

/// Why a probe produced no usable reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeFailure {
    TimedOut { after_ms: u64 },
    Failed { reason: String },
    InvalidReading { value: f64 },
}

impl ProbeFailure {
    pub fn timed_out(after: Duration) -> Self {
        ProbeFailure::TimedOut {
            after_ms: after.as_millis() as u64,
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::TimedOut { after_ms } => write!(f, "timed out after {}ms", after_ms),
            ProbeFailure::Failed { reason } => write!(f, "{}", reason),
            ProbeFailure::InvalidReading { value } => write!(f, "invalid reading {}", value),
        }
    }
}

/// A probe reading. Degraded readings carry 0.0 together with the failure,
/// so a real zero and a failed probe stay distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProbeFailure>,
}

impl Measurement {
    pub fn measured(value: f64) -> Self {
        Self {
            value,
            failure: None,
        }
    }

    pub fn degraded(failure: ProbeFailure) -> Self {
        Self {
            value: 0.0,
            failure: Some(failure),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// 单个目标服务器的测速结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetResult {
    pub server_id: String,
    pub name: String,
    pub country: String,
    pub sponsor: String,
    pub distance_km: f64,
    pub latency_ms: Measurement,
    pub download_mbps: Measurement,
    pub upload_mbps: Measurement,
}
