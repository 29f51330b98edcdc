use crate::config::ProbeSettings;
use crate::error::{Result, SpeedtestError};
use crate::traits::TransportProbe;
use crate::utils::endpoint_url;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::{Duration, Instant};

/// Timing-only HTTP probe for speedtest.net style servers.
///
/// Given a server URL such as `http://host:8080/speedtest/upload.php`:
/// - latency: GET `latency.txt` next to it, best of `ping_samples`
/// - download: GET `random{N}x{N}.jpg` for each configured size
/// - upload: POST a generated payload of each configured size to the URL itself
pub struct HttpProbe {
    client: Client,
    ping_samples: u32,
    download_sizes: Vec<u32>,
    upload_sizes_kb: Vec<u32>,
}

impl HttpProbe {
    pub fn new(client: Client, settings: &ProbeSettings, saving_mode: bool) -> Self {
        let (download_sizes, upload_sizes_kb) = if saving_mode {
            (
                settings.saving_download_sizes.clone(),
                settings.saving_upload_sizes_kb.clone(),
            )
        } else {
            (settings.download_sizes.clone(), settings.upload_sizes_kb.clone())
        };

        Self {
            client,
            ping_samples: settings.ping_samples.max(1),
            download_sizes,
            upload_sizes_kb,
        }
    }
}

#[async_trait]
impl TransportProbe for HttpProbe {
    async fn ping(&self, url: &str) -> Result<Duration> {
        let target = endpoint_url(url, "latency.txt")?;
        let mut best = Duration::MAX;

        for _ in 0..self.ping_samples {
            let start = Instant::now();
            self.client
                .get(target.clone())
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            best = best.min(start.elapsed());
        }

        debug!("Latency to {}: {:?}", target, best);
        Ok(best)
    }

    async fn download_throughput(&self, url: &str, latency: Duration) -> Result<f64> {
        if self.download_sizes.is_empty() {
            return Err(SpeedtestError::Probe("no download sizes configured".to_string()));
        }

        let start = Instant::now();
        let mut bytes = 0u64;

        for size in &self.download_sizes {
            let target = endpoint_url(url, &format!("random{0}x{0}.jpg", size))?;
            let body = self
                .client
                .get(target)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            bytes += body.len() as u64;
        }

        mbps(bytes, start.elapsed(), latency, self.download_sizes.len())
    }

    async fn upload_throughput(&self, url: &str, latency: Duration) -> Result<f64> {
        if self.upload_sizes_kb.is_empty() {
            return Err(SpeedtestError::Probe("no upload sizes configured".to_string()));
        }

        let start = Instant::now();
        let mut bytes = 0u64;

        for size_kb in &self.upload_sizes_kb {
            let payload = vec![b'0'; *size_kb as usize * 1024];
            bytes += payload.len() as u64;
            self.client
                .post(url)
                .body(payload)
                .send()
                .await?
                .error_for_status()?;
        }

        mbps(bytes, start.elapsed(), latency, self.upload_sizes_kb.len())
    }
}

// 每个请求扣除一次往返延迟, 扣完为零时退回到原始耗时
fn mbps(bytes: u64, elapsed: Duration, latency: Duration, requests: usize) -> Result<f64> {
    let overhead = latency.saturating_mul(requests as u32);
    let window = match elapsed.saturating_sub(overhead) {
        w if w.is_zero() => elapsed,
        w => w,
    };

    if window.is_zero() {
        return Err(SpeedtestError::Probe("transfer too fast to time".to_string()));
    }
    Ok(bytes as f64 * 8.0 / window.as_secs_f64() / 1_000_000.0)
}
