use clap::Parser;
use common::{FEED_REFERER, HarvestMode};
use harvester::HarvestConfig;
use harvester::config::{
    DEFAULT_DETAIL_WAIT_SECS, DEFAULT_FEED_WAIT_SECS, DEFAULT_IDLE_THRESHOLD, DEFAULT_OUTPUT_DIR,
    DEFAULT_PAUSE_MAX_SECS, DEFAULT_PAUSE_MIN_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SCROLL_STEP,
};
use std::path::PathBuf;
use surface_webdriver::{BrowserOptions, DEFAULT_WEBDRIVER_URL};

/// 命令行参数，均可通过 `PINHARVEST_*` 环境变量（或 `.env`）提供
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pinharvest",
    version,
    about = "Stream every image of a lazily loaded Pinterest board to disk"
)]
pub struct Cli {
    /// Board URL, e.g. https://www.pinterest.com/<user>/<board>/
    #[arg(env = "PINHARVEST_BOARD_URL")]
    pub board_url: String,

    /// shallow: grid thumbnails, deep: open every pin page for the large image
    #[arg(long, short, env = "PINHARVEST_MODE", default_value = "shallow")]
    pub mode: HarvestMode,

    /// Destination folder
    #[arg(long, short, env = "PINHARVEST_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Bottom checks without growth before the harvest finishes
    #[arg(long, env = "PINHARVEST_IDLE_THRESHOLD", default_value_t = DEFAULT_IDLE_THRESHOLD)]
    pub idle_threshold: u32,

    /// Scroll distance as a fraction of the viewport height
    #[arg(long, env = "PINHARVEST_SCROLL_STEP", default_value_t = DEFAULT_SCROLL_STEP)]
    pub scroll_step: f64,

    /// Per-download timeout in seconds
    #[arg(long, env = "PINHARVEST_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: f64,

    #[arg(long, env = "PINHARVEST_PAUSE_MIN", default_value_t = DEFAULT_PAUSE_MIN_SECS)]
    pub pause_min: f64,

    #[arg(long, env = "PINHARVEST_PAUSE_MAX", default_value_t = DEFAULT_PAUSE_MAX_SECS)]
    pub pause_max: f64,

    /// Seconds to wait for the preview image tag on a pin page (deep mode)
    #[arg(long, env = "PINHARVEST_DETAIL_WAIT", default_value_t = DEFAULT_DETAIL_WAIT_SECS)]
    pub detail_wait: f64,

    /// Seconds to wait for the board to show pins
    #[arg(long, env = "PINHARVEST_FEED_WAIT", default_value_t = DEFAULT_FEED_WAIT_SECS)]
    pub feed_wait: f64,

    #[arg(long, env = "PINHARVEST_REFERER", default_value = FEED_REFERER)]
    pub referer: String,

    /// WebDriver endpoint (chromedriver)
    #[arg(long, env = "PINHARVEST_WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
    pub webdriver_url: String,

    #[arg(long, env = "PINHARVEST_HEADLESS")]
    pub headless: bool,

    /// Reuse a Chrome profile directory to stay logged in
    #[arg(long, env = "PINHARVEST_PROFILE_DIR")]
    pub profile_dir: Option<PathBuf>,

    /// Harvest a saved board page instead of driving a browser (shallow only)
    #[arg(long, value_name = "FILE.html")]
    pub snapshot: Option<PathBuf>,

    /// Also write the summary as JSON
    #[arg(long, env = "PINHARVEST_SUMMARY_JSON", value_name = "FILE")]
    pub summary_json: Option<PathBuf>,
}

impl Cli {
    pub fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig {
            mode: self.mode,
            output_dir: self.output_dir.clone(),
            idle_threshold: self.idle_threshold,
            scroll_step: self.scroll_step,
            request_timeout_secs: self.request_timeout,
            pause_min_secs: self.pause_min,
            pause_max_secs: self.pause_max,
            detail_wait_secs: self.detail_wait,
            feed_wait_secs: self.feed_wait,
            referer: self.referer.clone(),
            ..HarvestConfig::default()
        }
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            webdriver_url: self.webdriver_url.clone(),
            headless: self.headless,
            profile_dir: self.profile_dir.clone(),
        }
    }
}
