//! 渲染面接口
//!
//! 核心只依赖这个 trait，不依赖任何具体的浏览器自动化库。
//! 具体实现见 `surface-webdriver`（真实浏览器）与 `surface-snapshot`（静态 HTML）。

use serde_json::Value;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// 等待选择器出现时的轮询间隔
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 渲染面错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// 页面加载失败
    Navigation(String),
    /// 元素查询或属性读取失败（包括元素已失效）
    Query(String),
    /// 脚本执行失败
    Script(String),
    /// 上下文（标签页）打开、切换或关闭失败
    Context(String),
    /// 当前实现不支持的操作
    Unsupported(String),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigation(msg) => write!(f, "navigation failed: {}", msg),
            Self::Query(msg) => write!(f, "element query failed: {}", msg),
            Self::Script(msg) => write!(f, "script failed: {}", msg),
            Self::Context(msg) => write!(f, "context switch failed: {}", msg),
            Self::Unsupported(msg) => write!(f, "unsupported operation: {}", msg),
        }
    }
}

impl std::error::Error for SurfaceError {}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

/// 渲染面使用的脚本
///
/// 脚本只用于滚动控制与高度测量（以及打开信息流时关闭遮罩），
/// 非浏览器实现按常量匹配来模拟它们。
pub mod script {
    /// 返回视口高度
    pub const VIEWPORT_HEIGHT: &str = "return window.innerHeight || 800;";
    /// 返回文档高度
    pub const DOCUMENT_HEIGHT: &str = "return Math.max(\
        document.body.scrollHeight, document.documentElement.scrollHeight,\
        document.body.offsetHeight, document.documentElement.offsetHeight,\
        document.body.clientHeight, document.documentElement.clientHeight);";
    /// 返回当前纵向滚动位置
    pub const SCROLL_OFFSET: &str = "return window.pageYOffset || document.documentElement.scrollTop || 0;";
    /// 参数：目标纵向位置
    pub const SCROLL_TO: &str = "window.scrollTo(0, arguments[0]);";
    /// 参数：纵向偏移量
    pub const SCROLL_BY: &str = "window.scrollBy(0, arguments[0]);";
    /// 参数：按钮选择器；点击第一个匹配的按钮并返回是否点击
    pub const DISMISS_OVERLAY: &str = "var b = document.querySelector(arguments[0]); \
        if (b) { b.click(); return true; } return false;";
}

/// 浏览器渲染面能力
///
/// 所有操作都在采集工作者上顺序调用，实现不需要支持并发使用。
/// 同一时间只有一个上下文处于活动状态，查询、导航与脚本都作用于活动上下文。
#[async_trait::async_trait]
pub trait RenderSurface: Send + Sync {
    /// 元素句柄
    type Element: Send + Sync;
    /// 上下文（标签页）句柄
    type Context: Clone + Debug + Send + Sync;

    /// 在活动上下文中打开URL
    async fn navigate(&self, url: &str) -> SurfaceResult<()>;

    /// 查询所有匹配 CSS 选择器的元素
    async fn query_selector_all(&self, selector: &str) -> SurfaceResult<Vec<Self::Element>>;

    /// 读取元素属性
    async fn attribute(&self, element: &Self::Element, name: &str) -> SurfaceResult<Option<String>>;

    /// 从元素自身开始向上查找第一个匹配 `ancestor_selector` 的元素并读取其属性
    async fn closest_attribute(
        &self,
        element: &Self::Element,
        ancestor_selector: &str,
        name: &str,
    ) -> SurfaceResult<Option<String>>;

    /// 执行脚本，见 [`script`]
    async fn execute_script(&self, code: &str, args: Vec<Value>) -> SurfaceResult<Value>;

    /// 活动上下文的当前URL
    async fn current_url(&self) -> SurfaceResult<String>;

    /// 活动上下文的句柄
    async fn current_context(&self) -> SurfaceResult<Self::Context>;

    /// 打开一个新的上下文，打开后活动上下文是哪个由实现决定，调用方应显式切换
    async fn open_secondary_context(&self) -> SurfaceResult<Self::Context>;

    async fn switch_to(&self, context: &Self::Context) -> SurfaceResult<()>;

    /// 关闭指定上下文，之后调用方需要切换回仍然存在的上下文
    async fn close_context(&self, context: &Self::Context) -> SurfaceResult<()>;

    /// 等待选择器至少匹配一个元素，超时返回 `false`
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> SurfaceResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.query_selector_all(selector).await?.is_empty() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}
