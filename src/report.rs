use crate::error::Result;
use crate::types::{Measurement, Server, TargetResult};
use serde::Serialize;

/// Per-target results, in target selection order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchmarkReport {
    pub results: Vec<TargetResult>,
}

/// Mean rates across all targets of a multi-target run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub targets: usize,
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [TargetResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    aggregate: Option<Aggregate>,
}

impl BenchmarkReport {
    pub fn result_for(&self, server_id: &str) -> Option<&TargetResult> {
        self.results.iter().find(|r| r.server_id == server_id)
    }

    /// Arithmetic mean over every target, degraded zeros included.
    /// `None` for a single target: its raw values are reported instead.
    pub fn aggregate(&self) -> Option<Aggregate> {
        if self.results.len() < 2 {
            return None;
        }

        let n = self.results.len() as f64;
        let download: f64 = self.results.iter().map(|r| r.download_mbps.value).sum();
        let upload: f64 = self.results.iter().map(|r| r.upload_mbps.value).sum();

        Some(Aggregate {
            targets: self.results.len(),
            download_mbps: download / n,
            upload_mbps: upload / n,
        })
    }

    /// Final result lines as written to the report sink.
    pub fn summary_lines(&self) -> Vec<String> {
        match self.results.as_slice() {
            [] => Vec::new(),
            [only] => vec![
                format!("Download: {}", format_rate(&only.download_mbps)),
                format!("Upload: {}", format_rate(&only.upload_mbps)),
            ],
            results => {
                let mut lines: Vec<String> = results
                    .iter()
                    .map(|r| {
                        format!(
                            "[{:>4}] Download: {}, Upload: {}",
                            r.server_id,
                            format_rate(&r.download_mbps),
                            format_rate(&r.upload_mbps)
                        )
                    })
                    .collect();

                if let Some(avg) = self.aggregate() {
                    lines.push(format!("Download Avg: {:5.2} Mbit/s", avg.download_mbps));
                    lines.push(format!("Upload Avg: {:5.2} Mbit/s", avg.upload_mbps));
                }
                lines
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let view = JsonReport {
            results: &self.results,
            aggregate: self.aggregate(),
        };
        Ok(serde_json::to_string_pretty(&view)?)
    }
}

pub fn announce_line(server: &Server) -> String {
    format!(
        "Target Server: [{:>4}] {:>8.2}km {} ({}) by {}",
        server.id, server.distance_km, server.name, server.country, server.sponsor
    )
}

fn format_rate(m: &Measurement) -> String {
    match &m.failure {
        Some(failure) => format!("{:5.2} Mbit/s (degraded: {})", m.value, failure),
        None => format!("{:5.2} Mbit/s", m.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeFailure;

    fn result(id: &str, download: f64, upload: f64) -> TargetResult {
        TargetResult {
            server_id: id.to_string(),
            name: format!("Server {}", id),
            country: "Testland".to_string(),
            sponsor: "ISP".to_string(),
            distance_km: 1.0,
            latency_ms: Measurement::measured(12.0),
            download_mbps: Measurement::measured(download),
            upload_mbps: Measurement::measured(upload),
        }
    }

    #[test]
    fn test_aggregate_is_mean() {
        let report = BenchmarkReport {
            results: vec![result("1", 10.0, 1.0), result("2", 20.0, 2.0), result("3", 30.0, 6.0)],
        };
        let avg = report.aggregate().unwrap();
        assert_eq!(avg.targets, 3);
        assert_eq!(avg.download_mbps, 20.0);
        assert_eq!(avg.upload_mbps, 3.0);
    }

    #[test]
    fn test_single_target_has_no_aggregate() {
        let report = BenchmarkReport {
            results: vec![result("7", 93.5, 11.25)],
        };
        assert!(report.aggregate().is_none());
        assert_eq!(
            report.summary_lines(),
            vec!["Download: 93.50 Mbit/s", "Upload: 11.25 Mbit/s"]
        );
    }

    #[test]
    fn test_multi_target_lines() {
        let report = BenchmarkReport {
            results: vec![result("12", 10.0, 4.0), result("3456", 20.0, 8.0)],
        };
        assert_eq!(
            report.summary_lines(),
            vec![
                "[  12] Download: 10.00 Mbit/s, Upload:  4.00 Mbit/s",
                "[3456] Download: 20.00 Mbit/s, Upload:  8.00 Mbit/s",
                "Download Avg: 15.00 Mbit/s",
                "Upload Avg:  6.00 Mbit/s",
            ]
        );
    }

    #[test]
    fn test_degraded_rate_is_marked() {
        let mut r = result("5", 0.0, 3.0);
        r.download_mbps = Measurement::degraded(ProbeFailure::Failed {
            reason: "connection reset".to_string(),
        });
        let report = BenchmarkReport { results: vec![r] };

        assert_eq!(
            report.summary_lines()[0],
            "Download:  0.00 Mbit/s (degraded: connection reset)"
        );
    }

    #[test]
    fn test_result_lookup_and_json() -> Result<()> {
        let report = BenchmarkReport {
            results: vec![result("1", 10.0, 1.0), result("2", 20.0, 2.0)],
        };
        assert_eq!(report.result_for("2").map(|r| r.download_mbps.value), Some(20.0));
        assert!(report.result_for("9").is_none());

        let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
        assert_eq!(json["results"][0]["server_id"], "1");
        assert_eq!(json["aggregate"]["download_mbps"], 15.0);
        assert!(json["results"][0]["download_mbps"].get("failure").is_none());
        Ok(())
    }

    #[test]
    fn test_announce_line() {
        let server = Server {
            id: "42".to_string(),
            name: "Berlin".to_string(),
            country: "Germany".to_string(),
            sponsor: "Example ISP".to_string(),
            distance_km: 5.0,
            ..Default::default()
        };
        assert_eq!(
            announce_line(&server),
            "Target Server: [  42]     5.00km Berlin (Germany) by Example ISP"
        );
    }
}
