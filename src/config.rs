//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::SeedResult;
use crate::store::StoreLocation;

/// 默认存储位置
pub const DEFAULT_STORE: &str = "sqlite:stratagems.db";

/// 延迟探测配置
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    // 兼容 chat/completions 协议的服务地址
    pub base_url: Url,
    pub model: String,
    // 存放 API 凭据的环境变量名
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1/").expect("内置地址合法"),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "LLM_API_KEY".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 规则集文件路径，None 表示使用内置规则集
    pub ruleset_path: Option<PathBuf>,
    // 存储位置
    pub store: StoreLocation,
    pub probe: ProbeConfig,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            ruleset_path: None,
            store: StoreLocation::Sqlite(PathBuf::from("stratagems.db")),
            probe: ProbeConfig::default(),
            verbose: false,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ruleset_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.ruleset_path = path;
        self
    }

    pub fn store(mut self, store: StoreLocation) -> Self {
        self.config.store = store;
        self
    }

    /// 解析并设置探测服务地址（补全末尾的 `/`，保证 join 时不丢路径段）
    pub fn probe_base_url(mut self, url: &str) -> SeedResult<Self> {
        let normalized = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        };
        self.config.probe.base_url = Url::parse(&normalized)?;
        Ok(self)
    }

    pub fn probe_model(mut self, model: impl Into<String>) -> Self {
        self.config.probe.model = model.into();
        self
    }

    pub fn probe_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.probe.api_key_env = var.into();
        self
    }

    pub fn probe_timeout(mut self, secs: u64) -> Self {
        self.config.probe.timeout = Duration::from_secs(secs);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigManager::get_default();
        assert!(config.ruleset_path.is_none());
        assert_eq!(config.store, DEFAULT_STORE.parse::<StoreLocation>().unwrap());
        assert_eq!(config.probe.api_key_env, "LLM_API_KEY");
    }

    #[test]
    fn test_probe_base_url_gets_trailing_slash() {
        let config = ConfigManager::custom()
            .probe_base_url("http://localhost:8080/v1")
            .unwrap()
            .build();
        assert_eq!(config.probe.base_url.as_str(), "http://localhost:8080/v1/");
        assert_eq!(
            config.probe.base_url.join("chat/completions").unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_probe_base_url_rejects_garbage() {
        assert!(ConfigManager::custom().probe_base_url("not a url").is_err());
    }
}
