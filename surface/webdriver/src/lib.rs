//! WebDriver 渲染面
//!
//! 通过 W3C WebDriver 协议（例如 chromedriver）驱动真实浏览器。
//! 上下文对应浏览器标签页。

use anyhow::{Result, anyhow};
use common::{RenderSurface, SurfaceError, SurfaceResult};
use fantoccini::elements::Element;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

mod tests;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// 降低自动化特征、避免容器环境崩溃的 Chrome 启动参数
const CHROME_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--start-maximized",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
];

/// 向上查找祖先并读取属性；`href` 返回浏览器解析后的绝对地址
const CLOSEST_ATTRIBUTE: &str = "var a = arguments[0].closest(arguments[1]); \
    if (!a) { return null; } \
    return arguments[2] === 'href' ? a.href : a.getAttribute(arguments[2]);";

/// 浏览器启动选项
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub webdriver_url: String,
    pub headless: bool,
    /// 复用的浏览器用户目录，可以保持登录状态
    pub profile_dir: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: false,
            profile_dir: None,
        }
    }
}

impl BrowserOptions {
    /// 传给 chromedriver 的启动参数
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args: Vec<String> = CHROME_ARGS.iter().map(|s| s.to_string()).collect();
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(dir) = &self.profile_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }
        args
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": self.chrome_args(),
                "excludeSwitches": ["enable-automation"],
            }),
        );
        caps
    }
}

fn cmd_error(kind: fn(String) -> SurfaceError) -> impl Fn(fantoccini::error::CmdError) -> SurfaceError {
    move |e| kind(e.to_string())
}

/// WebDriver 渲染面
///
/// 会话由创建者拥有，采集结束后由创建者调用 [`WebDriverSurface::quit`]。
pub struct WebDriverSurface {
    client: Client,
}

impl WebDriverSurface {
    /// 连接 WebDriver 服务并启动浏览器
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        log::info!("Connecting to WebDriver at {}", options.webdriver_url);
        let client = ClientBuilder::rustls()
            .map_err(|e| anyhow!("Failed to set up TLS for WebDriver: {}", e))?
            .capabilities(options.capabilities())
            .connect(&options.webdriver_url)
            .await
            .map_err(|e| anyhow!("Failed to start browser session: {}", e))?;
        Ok(Self { client })
    }

    /// 结束会话并关闭浏览器
    pub async fn quit(&self) -> Result<()> {
        log::info!("Closing browser session");
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| anyhow!("Failed to close browser: {}", e))
    }
}

#[async_trait::async_trait]
impl RenderSurface for WebDriverSurface {
    type Element = Element;
    type Context = WindowHandle;

    async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        self.client
            .goto(url)
            .await
            .map_err(cmd_error(SurfaceError::Navigation))
    }

    async fn query_selector_all(&self, selector: &str) -> SurfaceResult<Vec<Element>> {
        self.client
            .find_all(Locator::Css(selector))
            .await
            .map_err(cmd_error(SurfaceError::Query))
    }

    async fn attribute(&self, element: &Element, name: &str) -> SurfaceResult<Option<String>> {
        element
            .attr(name)
            .await
            .map_err(cmd_error(SurfaceError::Query))
    }

    async fn closest_attribute(
        &self,
        element: &Element,
        ancestor_selector: &str,
        name: &str,
    ) -> SurfaceResult<Option<String>> {
        let element = serde_json::to_value(element)
            .map_err(|e| SurfaceError::Query(format!("element not serializable: {}", e)))?;
        let value = self
            .client
            .execute(
                CLOSEST_ATTRIBUTE,
                vec![element, json!(ancestor_selector), json!(name)],
            )
            .await
            .map_err(cmd_error(SurfaceError::Query))?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn execute_script(&self, code: &str, args: Vec<Value>) -> SurfaceResult<Value> {
        self.client
            .execute(code, args)
            .await
            .map_err(cmd_error(SurfaceError::Script))
    }

    async fn current_url(&self) -> SurfaceResult<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(cmd_error(SurfaceError::Query))
    }

    async fn current_context(&self) -> SurfaceResult<WindowHandle> {
        self.client
            .window()
            .await
            .map_err(cmd_error(SurfaceError::Context))
    }

    async fn open_secondary_context(&self) -> SurfaceResult<WindowHandle> {
        let window = self
            .client
            .new_window(true)
            .await
            .map_err(cmd_error(SurfaceError::Context))?;
        log::debug!("Opened worker tab {:?}", window.handle);
        Ok(window.handle)
    }

    async fn switch_to(&self, context: &WindowHandle) -> SurfaceResult<()> {
        self.client
            .switch_to_window(context.clone())
            .await
            .map_err(cmd_error(SurfaceError::Context))
    }

    async fn close_context(&self, context: &WindowHandle) -> SurfaceResult<()> {
        // WebDriver 只能关闭当前窗口
        self.switch_to(context).await?;
        self.client
            .close_window()
            .await
            .map_err(cmd_error(SurfaceError::Context))
    }
}
