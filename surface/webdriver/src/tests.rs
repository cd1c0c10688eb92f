#[cfg(test)]
mod webdriver_tests {
    use crate::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_chrome_args() {
        let options = BrowserOptions::default();
        let args = options.chrome_args();
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(!args.iter().any(|a| a.starts_with("--user-data-dir")));

        let options = BrowserOptions {
            headless: true,
            profile_dir: Some(PathBuf::from("/tmp/profile")),
            ..BrowserOptions::default()
        };
        let args = options.chrome_args();
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
    }

    #[test]
    fn test_capabilities() {
        let caps = BrowserOptions::default().capabilities();
        assert_eq!(caps.get("browserName"), Some(&json!("chrome")));
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert_eq!(args.len(), CHROME_ARGS.len());
    }

    #[tokio::test]
    #[ignore = "需要本地 chromedriver，仅手动测试"]
    async fn test_open_and_switch_tabs() {
        let surface = WebDriverSurface::launch(&BrowserOptions {
            headless: true,
            ..BrowserOptions::default()
        })
        .await
        .unwrap();

        surface.navigate("https://example.com/").await.unwrap();
        let primary = surface.current_context().await.unwrap();
        let secondary = surface.open_secondary_context().await.unwrap();
        surface.switch_to(&secondary).await.unwrap();
        surface.navigate("https://example.org/").await.unwrap();
        surface.close_context(&secondary).await.unwrap();
        surface.switch_to(&primary).await.unwrap();
        println!("Back on: {}", surface.current_url().await.unwrap());

        let links = surface.query_selector_all("a").await.unwrap();
        for link in &links {
            println!("link: {:?}", surface.attribute(link, "href").await.unwrap());
        }

        surface.quit().await.unwrap();
    }
}
