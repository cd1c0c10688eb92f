//! 基于静态 HTML 的渲染面
//!
//! 信息流由若干 HTML 片段组成，初始只渲染第一段；
//! 滚动到距底部 [`LAZY_LOAD_MARGIN`] 以内时追加下一段，模拟懒加载的增长。
//! 其他 URL 对应的详情页在 [`SnapshotBuilder::page`] 中注册。
//!
//! 用于离线处理保存下来的页面，以及在测试中代替真实浏览器。

use common::{RenderSurface, SurfaceError, SurfaceResult, script};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

mod document;
mod tests;

/// 距底部多少像素以内触发下一段加载
pub const LAZY_LOAD_MARGIN: f64 = 10.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;
pub const DEFAULT_CHUNK_HEIGHT: f64 = 1000.0;

/// 上下文句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub usize);

/// 元素句柄，保存查询时的文档快照
#[derive(Debug, Clone)]
pub struct SnapshotElement {
    document: Arc<str>,
    selector: String,
    index: usize,
    attrs: HashMap<String, String>,
}

impl SnapshotElement {
    /// 查询时读取到的属性
    pub fn attrs(&self) -> &HashMap<String, String> {
        &self.attrs
    }
}

#[derive(Debug, Clone, Default)]
struct ContextState {
    url: Option<String>,
    scroll_y: f64,
    open: bool,
}

#[derive(Debug)]
struct State {
    feed_url: String,
    chunks: Vec<String>,
    revealed: usize,
    chunk_height: f64,
    viewport_height: f64,
    pages: HashMap<String, String>,
    contexts: Vec<ContextState>,
    active: usize,
    navigations: Vec<String>,
}

impl State {
    fn active(&self) -> SurfaceResult<&ContextState> {
        self.contexts
            .get(self.active)
            .filter(|ctx| ctx.open)
            .ok_or_else(|| SurfaceError::Context(format!("context {} is closed", self.active)))
    }

    fn active_mut(&mut self) -> SurfaceResult<&mut ContextState> {
        let active = self.active;
        self.contexts
            .get_mut(active)
            .filter(|ctx| ctx.open)
            .ok_or_else(|| SurfaceError::Context(format!("context {} is closed", active)))
    }

    fn on_feed(&self) -> SurfaceResult<bool> {
        Ok(self.active()?.url.as_deref() == Some(self.feed_url.as_str()))
    }

    fn feed_height(&self) -> f64 {
        (self.revealed as f64 * self.chunk_height).max(self.viewport_height)
    }

    fn document_height(&self) -> SurfaceResult<f64> {
        if self.on_feed()? {
            Ok(self.feed_height())
        } else {
            Ok(self.viewport_height)
        }
    }

    /// 活动上下文当前的 HTML
    fn document(&self) -> SurfaceResult<String> {
        let ctx = self.active()?;
        let Some(url) = ctx.url.as_deref() else {
            return Ok(String::from("<html><body></body></html>"));
        };
        if url == self.feed_url {
            Ok(format!(
                "<html><body>{}</body></html>",
                self.chunks[..self.revealed].join("\n")
            ))
        } else {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| SurfaceError::Navigation(format!("no snapshot for {}", url)))
        }
    }

    fn scroll_to(&mut self, y: f64) -> SurfaceResult<()> {
        let on_feed = self.on_feed()?;
        let max = (self.document_height()? - self.viewport_height).max(0.0);
        let y = y.clamp(0.0, max);
        self.active_mut()?.scroll_y = y;

        if on_feed
            && self.revealed < self.chunks.len()
            && y + self.viewport_height >= self.feed_height() - LAZY_LOAD_MARGIN
        {
            self.revealed += 1;
            log::trace!("Snapshot feed grew to {} chunks", self.revealed);
        }
        Ok(())
    }
}

/// [`SnapshotSurface`] 的建造者
pub struct SnapshotBuilder {
    feed_url: String,
    chunks: Vec<String>,
    chunk_height: f64,
    viewport_height: f64,
    pages: HashMap<String, String>,
}

impl SnapshotBuilder {
    /// 追加一段信息流内容
    pub fn feed_chunk(mut self, html: impl Into<String>) -> Self {
        self.chunks.push(html.into());
        self
    }

    /// 注册一个详情页
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn viewport_height(mut self, height: f64) -> Self {
        self.viewport_height = height.max(1.0);
        self
    }

    /// 每段信息流内容对应的文档高度
    pub fn chunk_height(mut self, height: f64) -> Self {
        self.chunk_height = height.max(1.0);
        self
    }

    pub fn build(self) -> SnapshotSurface {
        let revealed = self.chunks.len().min(1);
        let primary = ContextState {
            url: Some(self.feed_url.clone()),
            scroll_y: 0.0,
            open: true,
        };
        SnapshotSurface {
            state: Mutex::new(State {
                feed_url: self.feed_url,
                chunks: self.chunks,
                revealed,
                chunk_height: self.chunk_height,
                viewport_height: self.viewport_height,
                pages: self.pages,
                contexts: vec![primary],
                active: 0,
                navigations: Vec::new(),
            }),
        }
    }
}

/// 静态 HTML 渲染面
///
/// 构建后主上下文（`ContextId(0)`）已经停留在信息流URL上。
pub struct SnapshotSurface {
    state: Mutex<State>,
}

impl SnapshotSurface {
    pub fn builder(feed_url: impl Into<String>) -> SnapshotBuilder {
        SnapshotBuilder {
            feed_url: feed_url.into(),
            chunks: Vec::new(),
            chunk_height: DEFAULT_CHUNK_HEIGHT,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            pages: HashMap::new(),
        }
    }

    /// 单段静态页面，例如从浏览器保存下来的信息流页面
    pub fn from_html(feed_url: impl Into<String>, html: impl Into<String>) -> Self {
        Self::builder(feed_url).feed_chunk(html).build()
    }

    fn state(&self) -> SurfaceResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| SurfaceError::Context("snapshot state poisoned".to_string()))
    }

    // ==== 测试与诊断用的观察接口 ====

    pub fn active_context(&self) -> Option<ContextId> {
        self.state.lock().ok().map(|s| ContextId(s.active))
    }

    /// 仍处于打开状态的上下文数量
    pub fn open_contexts(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.contexts.iter().filter(|c| c.open).count())
            .unwrap_or(0)
    }

    /// 已渲染的信息流段数
    pub fn revealed_chunks(&self) -> usize {
        self.state.lock().map(|s| s.revealed).unwrap_or(0)
    }

    /// 主上下文的滚动位置
    pub fn primary_scroll_offset(&self) -> f64 {
        self.state
            .lock()
            .map(|s| s.contexts[0].scroll_y)
            .unwrap_or(0.0)
    }

    /// 所有 `navigate` 调用的URL，按调用顺序
    pub fn navigations(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.navigations.clone())
            .unwrap_or_default()
    }
}

fn number_arg(args: &[Value]) -> SurfaceResult<f64> {
    args.first()
        .and_then(Value::as_f64)
        .ok_or_else(|| SurfaceError::Script("expected a numeric argument".to_string()))
}

#[async_trait::async_trait]
impl RenderSurface for SnapshotSurface {
    type Element = SnapshotElement;
    type Context = ContextId;

    async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        let mut state = self.state()?;
        state.navigations.push(url.to_string());
        if url != state.feed_url && !state.pages.contains_key(url) {
            return Err(SurfaceError::Navigation(format!("no snapshot for {}", url)));
        }
        let ctx = state.active_mut()?;
        ctx.url = Some(url.to_string());
        ctx.scroll_y = 0.0;
        Ok(())
    }

    async fn query_selector_all(&self, selector: &str) -> SurfaceResult<Vec<SnapshotElement>> {
        let html: Arc<str> = Arc::from(self.state()?.document()?);
        let matches = document::select_attributes(&html, selector)?;
        Ok(matches
            .into_iter()
            .enumerate()
            .map(|(index, attrs)| SnapshotElement {
                document: Arc::clone(&html),
                selector: selector.to_string(),
                index,
                attrs,
            })
            .collect())
    }

    async fn attribute(&self, element: &SnapshotElement, name: &str) -> SurfaceResult<Option<String>> {
        Ok(element.attrs.get(name).cloned())
    }

    async fn closest_attribute(
        &self,
        element: &SnapshotElement,
        ancestor_selector: &str,
        name: &str,
    ) -> SurfaceResult<Option<String>> {
        document::closest_attribute(
            &element.document,
            &element.selector,
            element.index,
            ancestor_selector,
            name,
        )
    }

    async fn execute_script(&self, code: &str, args: Vec<Value>) -> SurfaceResult<Value> {
        let mut state = self.state()?;
        match code {
            script::VIEWPORT_HEIGHT => Ok(Value::from(state.viewport_height)),
            script::DOCUMENT_HEIGHT => Ok(Value::from(state.document_height()?)),
            script::SCROLL_OFFSET => Ok(Value::from(state.active()?.scroll_y)),
            script::SCROLL_TO => {
                let y = number_arg(&args)?;
                state.scroll_to(y)?;
                Ok(Value::Null)
            }
            script::SCROLL_BY => {
                let dy = number_arg(&args)?;
                let y = state.active()?.scroll_y + dy;
                state.scroll_to(y)?;
                Ok(Value::Null)
            }
            script::DISMISS_OVERLAY => Ok(Value::Bool(false)),
            other => Err(SurfaceError::Unsupported(format!("script {}", other))),
        }
    }

    async fn current_url(&self) -> SurfaceResult<String> {
        let state = self.state()?;
        Ok(state.active()?.url.clone().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn current_context(&self) -> SurfaceResult<ContextId> {
        let state = self.state()?;
        state.active()?;
        Ok(ContextId(state.active))
    }

    async fn open_secondary_context(&self) -> SurfaceResult<ContextId> {
        let mut state = self.state()?;
        state.contexts.push(ContextState {
            url: None,
            scroll_y: 0.0,
            open: true,
        });
        Ok(ContextId(state.contexts.len() - 1))
    }

    async fn switch_to(&self, context: &ContextId) -> SurfaceResult<()> {
        let mut state = self.state()?;
        match state.contexts.get(context.0) {
            Some(ctx) if ctx.open => {
                state.active = context.0;
                Ok(())
            }
            _ => Err(SurfaceError::Context(format!("no open context {}", context.0))),
        }
    }

    async fn close_context(&self, context: &ContextId) -> SurfaceResult<()> {
        let mut state = self.state()?;
        match state.contexts.get_mut(context.0) {
            Some(ctx) if ctx.open => {
                ctx.open = false;
                Ok(())
            }
            _ => Err(SurfaceError::Context(format!("no open context {}", context.0))),
        }
    }
}
