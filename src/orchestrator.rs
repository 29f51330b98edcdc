use crate::error::Result;
use crate::report::{announce_line, BenchmarkReport};
use crate::traits::{ReportSink, TransportProbe};
use crate::types::{Measurement, ProbeFailure, Server, TargetResult};
use crate::utils;
use indicatif::ProgressBar;
use log::{info, warn};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Upper bound for any single probe; expiry is recorded as a degraded zero.
    pub probe_timeout: Duration,
    /// Probe different targets concurrently. Probes of one target never overlap.
    pub parallel: bool,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(30),
            parallel: false,
            show_progress: false,
        }
    }
}

/// Runs latency, download and upload probes against each target and reports
/// the results to the sink.
pub struct Orchestrator<'a> {
    probe: &'a dyn TransportProbe,
    sink: &'a dyn ReportSink,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(probe: &'a dyn TransportProbe, sink: &'a dyn ReportSink, options: RunOptions) -> Self {
        Self {
            probe,
            sink,
            options,
        }
    }

    /// 测试所有目标服务器
    ///
    /// 逻辑:
    /// 1. 顺序模式: 逐个公布目标并测速
    /// 2. 并行模式: 先按顺序公布所有目标, 再并发测速 (join_all 保持结果顺序)
    /// 3. 按目标顺序输出汇总
    pub async fn run(&self, targets: &[Server]) -> Result<BenchmarkReport> {
        let pb = utils::progress_bar(targets.len() as u64, self.options.show_progress);

        let results = if self.options.parallel {
            for server in targets {
                self.emit(&pb, &announce_line(server))?;
            }

            let tasks = targets.iter().map(|server| {
                let pb = pb.clone();
                async move {
                    let result = self.benchmark_target(server).await;
                    pb.inc(1);
                    result
                }
            });
            futures::future::join_all(tasks).await
        } else {
            let mut results = Vec::with_capacity(targets.len());
            for server in targets {
                self.emit(&pb, &announce_line(server))?;
                results.push(self.benchmark_target(server).await);
                pb.inc(1);
            }
            results
        };

        pb.finish_and_clear();

        let report = BenchmarkReport { results };
        for line in report.summary_lines() {
            self.sink.line(&line)?;
        }
        Ok(report)
    }

    fn emit(&self, pb: &ProgressBar, line: &str) -> Result<()> {
        pb.suspend(|| self.sink.line(line))
    }

    // 同一目标的三个探测严格按 延迟 -> 下载 -> 上传 顺序执行
    async fn benchmark_target(&self, server: &Server) -> TargetResult {
        let url = server.url.as_str();

        let (latency_hint, latency_ms) = match self.guarded("latency", server, self.probe.ping(url)).await {
            Ok(latency) => (latency, Measurement::measured(latency.as_nanos() as f64 / 1_000_000.0)),
            Err(failure) => (Duration::ZERO, Measurement::degraded(failure)),
        };

        let download_mbps = self
            .rate("download", server, self.probe.download_throughput(url, latency_hint))
            .await;
        let upload_mbps = self
            .rate("upload", server, self.probe.upload_throughput(url, latency_hint))
            .await;

        info!(
            "[{}] latency {:.2}ms, download {:.2} Mbit/s, upload {:.2} Mbit/s",
            server.id, latency_ms.value, download_mbps.value, upload_mbps.value
        );

        TargetResult {
            server_id: server.id.clone(),
            name: server.name.clone(),
            country: server.country.clone(),
            sponsor: server.sponsor.clone(),
            distance_km: server.distance_km,
            latency_ms,
            download_mbps,
            upload_mbps,
        }
    }

    async fn guarded<T>(
        &self,
        kind: &str,
        server: &Server,
        probe: impl Future<Output = Result<T>>,
    ) -> std::result::Result<T, ProbeFailure> {
        match tokio::time::timeout(self.options.probe_timeout, probe).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("{} probe against [{}] failed: {}", kind, server.id, e);
                Err(ProbeFailure::Failed {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                warn!(
                    "{} probe against [{}] timed out after {:?}",
                    kind, server.id, self.options.probe_timeout
                );
                Err(ProbeFailure::timed_out(self.options.probe_timeout))
            }
        }
    }

    async fn rate(
        &self,
        kind: &str,
        server: &Server,
        probe: impl Future<Output = Result<f64>>,
    ) -> Measurement {
        match self.guarded(kind, server, probe).await {
            Ok(mbps) if mbps.is_finite() && mbps >= 0.0 => Measurement::measured(mbps),
            Ok(mbps) => {
                warn!("{} probe against [{}] returned invalid rate {}", kind, server.id, mbps);
                Measurement::degraded(ProbeFailure::InvalidReading { value: mbps })
            }
            Err(failure) => Measurement::degraded(failure),
        }
    }
}
