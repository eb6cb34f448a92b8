use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_ADB: &str = "adb";

pub const DEFAULT_SCREENSHOT_BASE_URL: &str = "http://192.168.6.134:8080";
pub const DEFAULT_VISION_EXPLAIN_URL: &str = "http://api.xiaozhi.me/vision/explain";
pub const DEFAULT_TOKEN: &str = "test-token";
pub const DEFAULT_QUESTION: &str = "Describe what is on the screen";

pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(15);
pub const EXPLAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the event listener connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl ListenConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionConfig {
    pub screenshot_base_url: String,
    pub vision_explain_url: String,
    pub token: String,
    pub screenshot_timeout: Duration,
    pub explain_timeout: Duration,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            screenshot_base_url: DEFAULT_SCREENSHOT_BASE_URL.to_string(),
            vision_explain_url: DEFAULT_VISION_EXPLAIN_URL.to_string(),
            token: DEFAULT_TOKEN.to_string(),
            screenshot_timeout: SCREENSHOT_TIMEOUT,
            explain_timeout: EXPLAIN_TIMEOUT,
        }
    }
}
