use crate::error::Result;
use crate::types::UserInfo;
use async_trait::async_trait;
use std::time::Duration;

/// Locator: 解析调用者的公网 IP 与大致地理位置
#[async_trait]
pub trait Locator: Sync + Send {
    async fn locate(&self) -> Result<UserInfo>;
}

/// TransportProbe: 针对单个服务器端点的三种测量
///
/// The orchestrator guarantees the three calls for one endpoint never overlap
/// and always run in the order ping, download, upload.
#[async_trait]
pub trait TransportProbe: Sync + Send {
    /// Round-trip latency to the endpoint.
    async fn ping(&self, url: &str) -> Result<Duration>;

    /// Download throughput in Mbit/s. `latency` is the value measured by `ping`.
    async fn download_throughput(&self, url: &str, latency: Duration) -> Result<f64>;

    /// Upload throughput in Mbit/s. `latency` is the value measured by `ping`.
    async fn upload_throughput(&self, url: &str, latency: Duration) -> Result<f64>;
}

/// ReportSink: 报告输出目标 (控制台或文件)
pub trait ReportSink: Sync + Send {
    fn line(&self, line: &str) -> Result<()>;
}
