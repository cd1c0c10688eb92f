#[cfg(test)]
mod snapshot_tests {
    use crate::*;
    use common::{RenderSurface, SurfaceError, script};
    use serde_json::json;
    use std::time::Duration;

    const FEED: &str = "https://www.pinterest.com/someone/board/";

    fn chunk(ids: &[u32]) -> String {
        ids.iter()
            .map(|id| {
                format!(
                    r#"<a href="/pin/{id}/"><img src="https://i.example/{id}.jpg"></a>"#,
                    id = id
                )
            })
            .collect()
    }

    fn surface() -> SnapshotSurface {
        SnapshotSurface::builder(FEED)
            .viewport_height(800.0)
            .chunk_height(1000.0)
            .feed_chunk(chunk(&[1, 2]))
            .feed_chunk(chunk(&[3, 4]))
            .feed_chunk(chunk(&[5]))
            .page("https://www.pinterest.com/pin/1/", r#"<meta property="og:image" content="https://i.example/1-big.jpg">"#)
            .build()
    }

    async fn height(s: &SnapshotSurface) -> f64 {
        s.execute_script(script::DOCUMENT_HEIGHT, vec![])
            .await
            .unwrap()
            .as_f64()
            .unwrap()
    }

    #[tokio::test]
    async fn test_feed_grows_when_scrolled_to_bottom() {
        let s = surface();
        assert_eq!(s.revealed_chunks(), 1);
        assert_eq!(height(&s).await, 1000.0);
        assert_eq!(s.query_selector_all("a[href*='/pin/']").await.unwrap().len(), 2);

        // 没到底部，不增长
        s.execute_script(script::SCROLL_TO, vec![json!(100)]).await.unwrap();
        assert_eq!(s.revealed_chunks(), 1);

        // 到底部，追加下一段
        s.execute_script(script::SCROLL_TO, vec![json!(200)]).await.unwrap();
        assert_eq!(s.revealed_chunks(), 2);
        assert_eq!(height(&s).await, 2000.0);
        assert_eq!(s.query_selector_all("a[href*='/pin/']").await.unwrap().len(), 4);

        // 超出范围的滚动会被夹到底部
        s.execute_script(script::SCROLL_TO, vec![json!(99999)]).await.unwrap();
        assert_eq!(s.primary_scroll_offset(), 1200.0);
        assert_eq!(s.revealed_chunks(), 3);

        // 全部加载后不再增长
        s.execute_script(script::SCROLL_TO, vec![json!(99999)]).await.unwrap();
        assert_eq!(s.revealed_chunks(), 3);
        assert_eq!(height(&s).await, 3000.0);
    }

    #[tokio::test]
    async fn test_scroll_by_and_offset() {
        let s = surface();
        s.execute_script(script::SCROLL_TO, vec![json!(150)]).await.unwrap();
        s.execute_script(script::SCROLL_BY, vec![json!(-100)]).await.unwrap();
        let offset = s.execute_script(script::SCROLL_OFFSET, vec![]).await.unwrap();
        assert_eq!(offset.as_f64(), Some(50.0));

        let viewport = s.execute_script(script::VIEWPORT_HEIGHT, vec![]).await.unwrap();
        assert_eq!(viewport.as_f64(), Some(800.0));

        assert!(matches!(
            s.execute_script("return 1;", vec![]).await,
            Err(SurfaceError::Unsupported(_))
        ));
        assert!(matches!(
            s.execute_script(script::SCROLL_TO, vec![]).await,
            Err(SurfaceError::Script(_))
        ));
    }

    #[tokio::test]
    async fn test_contexts_keep_their_own_state() {
        let s = surface();
        let primary = s.current_context().await.unwrap();
        s.execute_script(script::SCROLL_TO, vec![json!(120)]).await.unwrap();

        let secondary = s.open_secondary_context().await.unwrap();
        assert_eq!(s.open_contexts(), 2);
        s.switch_to(&secondary).await.unwrap();
        assert_eq!(s.current_url().await.unwrap(), "about:blank");

        s.navigate("https://www.pinterest.com/pin/1/").await.unwrap();
        let metas = s.query_selector_all("meta[property='og:image']").await.unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(
            s.attribute(&metas[0], "content").await.unwrap().as_deref(),
            Some("https://i.example/1-big.jpg")
        );

        // 未注册的页面导航失败
        assert!(matches!(
            s.navigate("https://www.pinterest.com/pin/404/").await,
            Err(SurfaceError::Navigation(_))
        ));

        s.switch_to(&primary).await.unwrap();
        assert_eq!(s.current_url().await.unwrap(), FEED);
        assert_eq!(s.primary_scroll_offset(), 120.0);

        s.close_context(&secondary).await.unwrap();
        assert_eq!(s.open_contexts(), 1);
        assert!(s.switch_to(&secondary).await.is_err());
        assert_eq!(
            s.navigations(),
            vec![
                "https://www.pinterest.com/pin/1/".to_string(),
                "https://www.pinterest.com/pin/404/".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_closest_attribute_from_image() {
        let s = surface();
        let imgs = s.query_selector_all("a[href*='/pin/'] img").await.unwrap();
        assert_eq!(imgs.len(), 2);
        let href = s
            .closest_attribute(&imgs[1], "a[href*='/pin/']", "href")
            .await
            .unwrap();
        assert_eq!(href.as_deref(), Some("/pin/2/"));
        assert_eq!(imgs[0].attrs().get("src").map(String::as_str), Some("https://i.example/1.jpg"));
    }

    #[tokio::test]
    async fn test_wait_for_selector() {
        let s = surface();
        assert!(s
            .wait_for_selector("a[href*='/pin/']", Duration::from_millis(10))
            .await
            .unwrap());
        assert!(!s
            .wait_for_selector("video", Duration::from_millis(20))
            .await
            .unwrap());
    }
}
