use async_trait::async_trait;
use common::{SaveOutcome, build_media_client, convert_bytes, save_media};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 单次下载的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Saved(PathBuf),
    /// 目标文件已存在，没有发出请求
    AlreadyPresent(PathBuf),
    Failed(String),
}

/// 内容下载器
///
/// 任何网络或文件系统错误都以 [`FetchOutcome::Failed`] 返回，不会中断采集。
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, out_dir: &Path, id: Option<&str>) -> FetchOutcome;
}

/// 基于 reqwest 的下载器
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(referer: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_media_client(referer, timeout)?,
            timeout,
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, out_dir: &Path, id: Option<&str>) -> FetchOutcome {
        match save_media(&self.client, url, out_dir, id, self.timeout).await {
            Ok(SaveOutcome::AlreadyPresent(path)) => FetchOutcome::AlreadyPresent(path),
            Ok(SaveOutcome::Downloaded {
                path,
                bytes,
                dimensions,
            }) => {
                match dimensions {
                    Some((w, h)) => log::info!(
                        "Saved {} ({}, {}x{})",
                        path.display(),
                        convert_bytes(bytes as f64),
                        w,
                        h
                    ),
                    None => log::info!("Saved {} ({})", path.display(), convert_bytes(bytes as f64)),
                }
                FetchOutcome::Saved(path)
            }
            Err(e) => {
                log::warn!("Failed to download {}: {:#}", url, e);
                FetchOutcome::Failed(e.to_string())
            }
        }
    }
}
