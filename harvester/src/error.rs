//! 采集模块错误类型定义

use common::SurfaceError;
use std::time::Duration;

/// 运行级错误
///
/// 只有这些错误会离开主循环，编排器捕获后以 `Aborted` 结束本次采集并保留已有计数。
#[derive(Debug)]
pub enum HarvestError {
    /// 渲染面操作失败（例如无法切回主上下文）
    Surface(SurfaceError),
    /// 本地文件系统错误
    Io(std::io::Error),
    /// 配置无效
    Config(String),
}

impl std::fmt::Display for HarvestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Surface(e) => write!(f, "render surface error: {}", e),
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for HarvestError {}

impl From<SurfaceError> for HarvestError {
    fn from(error: SurfaceError) -> Self {
        Self::Surface(error)
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

pub type HarvestResult<T> = std::result::Result<T, HarvestError>;

/// 条目无法下载的原因，计为跳过而不是失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// 解析到的是视频容器
    Video(String),
    /// 没有任何可用的图片地址
    NoImage,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video(url) => write!(f, "video content ({})", url),
            Self::NoImage => write!(f, "no image found"),
        }
    }
}

/// 单个条目处理中的错误，全部在本地恢复
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// DOM 结构异常或元素失效，跳过该元素
    Extraction(String),
    /// 等待元数据超时，继续尝试下一优先级
    ResolutionTimeout { selector: String, waited: Duration },
    /// 下载失败
    Fetch(String),
    /// 视频或无图
    ContentUnavailable(UnavailableReason),
    /// 详情页加载失败
    Navigation(String),
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extraction(msg) => write!(f, "extraction failed: {}", msg),
            Self::ResolutionTimeout { selector, waited } => {
                write!(f, "timed out after {:?} waiting for {}", waited, selector)
            }
            Self::Fetch(msg) => write!(f, "download failed: {}", msg),
            Self::ContentUnavailable(reason) => write!(f, "skipped: {}", reason),
            Self::Navigation(msg) => write!(f, "page failed to load: {}", msg),
        }
    }
}

impl std::error::Error for ItemError {}

impl From<SurfaceError> for ItemError {
    fn from(error: SurfaceError) -> Self {
        match error {
            SurfaceError::Navigation(msg) => Self::Navigation(msg),
            other => Self::Extraction(other.to_string()),
        }
    }
}
