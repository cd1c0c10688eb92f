//! 媒体下载
//!
//! 流式写入目标目录；目标文件已存在时直接视为成功，不产生网络请求。

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::{FEED_REFERER, GENERAL_UA, convert_bytes, filename_from_url};

/// 下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 目标文件已存在，未发出请求
    AlreadyPresent(PathBuf),
    Downloaded {
        path: PathBuf,
        bytes: u64,
        /// 从首个数据块嗅探到的图片尺寸
        dimensions: Option<(usize, usize)>,
    },
}

/// 构建下载用的HTTP客户端，带浏览器 UA 与 Referer
pub fn build_media_client(referer: &str, connect_timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    let referer = if referer.is_empty() { FEED_REFERER } else { referer };
    headers.insert(
        reqwest::header::REFERER,
        reqwest::header::HeaderValue::from_str(referer)
            .map_err(|e| anyhow!("Invalid referer {}: {}", referer, e))?,
    );

    let client = reqwest::Client::builder()
        .user_agent(GENERAL_UA)
        .default_headers(headers)
        .connect_timeout(connect_timeout)
        .build()?;
    Ok(client)
}

/// 将 `url` 保存到 `out_dir`，文件名由 [`filename_from_url`] 推导
///
/// `timeout` 同时限制等待响应头和每个数据块的时间。
/// 数据先写入 `.part` 临时文件，完成后再重命名。
pub async fn save_media(
    client: &reqwest::Client,
    url: &str,
    out_dir: &Path,
    id: Option<&str>,
    timeout: Duration,
) -> Result<SaveOutcome> {
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let dest = out_dir.join(filename_from_url(url, id));
    if fs::try_exists(&dest).await.unwrap_or(false) {
        log::debug!("Already present, skip fetching: {}", dest.display());
        return Ok(SaveOutcome::AlreadyPresent(dest));
    }

    log::debug!("Starting download from: {}", url);
    let mut response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| anyhow!("Timed out waiting for response from {}", url))??;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP GET request failed: {}", response.status()));
    }

    let part = dest.with_extension(format!(
        "{}.part",
        dest.extension().and_then(|e| e.to_str()).unwrap_or("jpg")
    ));
    let mut file = fs::File::create(&part)
        .await
        .with_context(|| format!("Failed to create {}", part.display()))?;

    let mut bytes: u64 = 0;
    let mut dimensions = None;
    let written: Result<()> = async {
        loop {
            let chunk = tokio::time::timeout(timeout, response.chunk())
                .await
                .map_err(|_| anyhow!("Timed out reading body from {}", url))??;
            let Some(chunk) = chunk else { break };
            if bytes == 0 {
                dimensions = imagesize::blob_size(&chunk)
                    .ok()
                    .map(|size| (size.width, size.height));
            }
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(&part).await;
        return Err(e);
    }
    drop(file);

    fs::rename(&part, &dest)
        .await
        .with_context(|| format!("Failed to move {} into place", part.display()))?;

    log::debug!(
        "Successfully downloaded {} ({})",
        dest.display(),
        convert_bytes(bytes as f64)
    );
    Ok(SaveOutcome::Downloaded {
        path: dest,
        bytes,
        dimensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 只响应一次的本地HTTP服务，返回收到的请求头
    async fn serve_once(status: &'static str, body: Vec<u8>) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{}", addr), handle)
    }

    /// 最小的 PNG 头（1x1）
    fn tiny_png() -> Vec<u8> {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0, 0, 0, 13]);
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]);
        png.extend_from_slice(&[0x1f, 0x15, 0xc4, 0x89]);
        png
    }

    #[tokio::test]
    async fn test_save_media_streams_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let body = tiny_png();
        let (base, server) = serve_once("200 OK", body.clone()).await;
        let client = build_media_client(FEED_REFERER, Duration::from_secs(5)).unwrap();

        let url = format!("{}/736x/pic.png", base);
        let outcome = save_media(&client, &url, dir.path(), Some("1"), Duration::from_secs(5))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.to_ascii_lowercase().contains("referer: https://www.pinterest.com/"));
        assert!(request.contains("Mozilla/5.0"));

        match outcome {
            SaveOutcome::Downloaded { path, bytes, dimensions } => {
                assert_eq!(path, dir.path().join("pic.png"));
                assert_eq!(bytes, body.len() as u64);
                assert_eq!(dimensions, Some((1, 1)));
                assert_eq!(std::fs::read(&path).unwrap(), body);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!dir.path().join("pic.png.part").exists());
    }

    #[tokio::test]
    async fn test_save_media_is_idempotent_by_presence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exists.jpg"), b"old").unwrap();
        let client = build_media_client(FEED_REFERER, Duration::from_secs(1)).unwrap();

        // 端口 9 上没有服务，如果发出请求必然失败
        let outcome = save_media(
            &client,
            "http://127.0.0.1:9/a/exists.jpg",
            dir.path(),
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(outcome, SaveOutcome::AlreadyPresent(dir.path().join("exists.jpg")));
        assert_eq!(std::fs::read(dir.path().join("exists.jpg")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_save_media_rejects_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let (base, server) = serve_once("404 Not Found", b"nope".to_vec()).await;
        let client = build_media_client(FEED_REFERER, Duration::from_secs(5)).unwrap();

        let result = save_media(
            &client,
            &format!("{}/missing.jpg", base),
            dir.path(),
            Some("7"),
            Duration::from_secs(5),
        )
        .await;
        server.await.unwrap();

        assert!(result.is_err());
        assert!(!dir.path().join("missing.jpg").exists());
        assert!(!dir.path().join("missing.jpg.part").exists());
    }
}
