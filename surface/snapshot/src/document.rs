//! scraper 上的查询辅助函数
//!
//! `Html` 不能跨 await 持有，所以每次查询都在同步函数里完成解析并返回拥有所有权的数据。

use common::{SurfaceError, SurfaceResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

pub(crate) fn parse_selector(selector: &str) -> SurfaceResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| SurfaceError::Query(format!("invalid selector {}: {:?}", selector, e)))
}

/// 返回每个匹配元素的属性表，按文档顺序
pub(crate) fn select_attributes(
    html: &str,
    selector: &str,
) -> SurfaceResult<Vec<HashMap<String, String>>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| {
            el.value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .collect())
}

/// 定位第 `index` 个匹配 `selector` 的元素，从它自身开始向上找第一个匹配 `ancestor_selector` 的元素
pub(crate) fn closest_attribute(
    html: &str,
    selector: &str,
    index: usize,
    ancestor_selector: &str,
    name: &str,
) -> SurfaceResult<Option<String>> {
    let selector_parsed = parse_selector(selector)?;
    let ancestor = parse_selector(ancestor_selector)?;
    let document = Html::parse_document(html);

    let Some(element) = document.select(&selector_parsed).nth(index) else {
        return Err(SurfaceError::Query(format!(
            "stale element #{} for {}",
            index, selector
        )));
    };

    let found = std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|el| ancestor.matches(el));

    Ok(found
        .and_then(|el| el.value().attr(name))
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = r#"
        <div class="grid">
            <a href="/pin/1/"><div><img src="https://i.example/1.jpg" alt="one"></div></a>
            <a href="/pin/2/"><img data-src="https://i.example/2.jpg"></a>
            <div><img src="https://i.example/loose.jpg"></div>
        </div>
    "#;

    #[test]
    fn test_select_attributes() {
        let imgs = select_attributes(GRID, "a[href*='/pin/'] img").unwrap();
        assert_eq!(imgs.len(), 2);
        assert_eq!(imgs[0].get("src").map(String::as_str), Some("https://i.example/1.jpg"));
        assert_eq!(imgs[1].get("data-src").map(String::as_str), Some("https://i.example/2.jpg"));
    }

    #[test]
    fn test_closest_attribute_walks_up() {
        let href = closest_attribute(GRID, "img", 0, "a[href*='/pin/']", "href").unwrap();
        assert_eq!(href.as_deref(), Some("/pin/1/"));

        // 不在链接里的图片
        let none = closest_attribute(GRID, "img", 2, "a[href*='/pin/']", "href").unwrap();
        assert_eq!(none, None);

        // 超出范围的索引视为失效元素
        assert!(closest_attribute(GRID, "img", 9, "a", "href").is_err());
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            select_attributes(GRID, "a[[["),
            Err(SurfaceError::Query(_))
        ));
    }
}
