use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Url};
use std::time::Duration;

const USER_AGENT: &str = concat!("speedprobe/", env!("CARGO_PKG_VERSION"));

/// 构建 HTTP Client, 强制设置超时, 防止慢源阻塞整个流程
pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Progress bar advanced once per benchmarked target; hidden when disabled.
pub fn progress_bar(len: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("|| "));
    }
    pb.set_message("Testing...");
    pb
}

/// Resolves `file` against the directory of a server URL.
///
/// `http://host:8080/speedtest/upload.php?x=1`, `latency.txt` -> `http://host:8080/speedtest/latency.txt`
pub fn endpoint_url(server_url: &str, file: &str) -> Result<Url> {
    Ok(Url::parse(server_url)?.join(file)?)
}
