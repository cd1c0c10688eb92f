//! 滚动与高度测量，封装在脚本执行之上

use common::{RenderSurface, SurfaceError, SurfaceResult, script};
use serde_json::{Value, json};

/// 视口高度无法读取时使用的默认值
pub const FALLBACK_VIEWPORT_HEIGHT: f64 = 800.0;

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub async fn viewport_height<S: RenderSurface + ?Sized>(surface: &S) -> SurfaceResult<f64> {
    let value = surface.execute_script(script::VIEWPORT_HEIGHT, vec![]).await?;
    Ok(as_number(&value)
        .filter(|h| *h > 0.0)
        .unwrap_or(FALLBACK_VIEWPORT_HEIGHT))
}

pub async fn document_height<S: RenderSurface + ?Sized>(surface: &S) -> SurfaceResult<f64> {
    let value = surface.execute_script(script::DOCUMENT_HEIGHT, vec![]).await?;
    as_number(&value)
        .ok_or_else(|| SurfaceError::Script(format!("document height is not a number: {}", value)))
}

pub async fn scroll_offset<S: RenderSurface + ?Sized>(surface: &S) -> SurfaceResult<f64> {
    let value = surface.execute_script(script::SCROLL_OFFSET, vec![]).await?;
    Ok(as_number(&value).unwrap_or(0.0))
}

pub async fn scroll_to<S: RenderSurface + ?Sized>(surface: &S, y: f64) -> SurfaceResult<()> {
    surface
        .execute_script(script::SCROLL_TO, vec![json!(y.max(0.0))])
        .await?;
    Ok(())
}

pub async fn scroll_by<S: RenderSurface + ?Sized>(surface: &S, dy: f64) -> SurfaceResult<()> {
    surface.execute_script(script::SCROLL_BY, vec![json!(dy)]).await?;
    Ok(())
}
