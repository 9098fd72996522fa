//! 规则加载管理器
//! 负责从本地文件或内置规则集读取规则文档

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use super::model::RuleSet;
use crate::config::GlobalConfig;
use crate::error::{SeedError, SeedResult};

/// 编译期嵌入的规则集
#[cfg(feature = "embedded-rules")]
const EMBEDDED_RULESET: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/stratagems.json"));

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 加载规则集（指定文件优先，否则使用内置规则集）
    pub async fn load(config: &GlobalConfig) -> SeedResult<RuleSet> {
        match &config.ruleset_path {
            Some(path) => Self::load_file(path).await,
            None => Self::load_embedded(),
        }
    }

    /// 从本地 JSON 文件加载
    pub async fn load_file(path: &Path) -> SeedResult<RuleSet> {
        debug!("读取规则文件：{}", path.display());
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SeedError::RuleLoadError(format!("无法读取 {}：{}", path.display(), e))
        })?;
        Self::parse_str(&content)
    }

    /// 加载内置规则集
    #[cfg(feature = "embedded-rules")]
    pub fn load_embedded() -> SeedResult<RuleSet> {
        debug!("使用内置规则集");
        Self::parse_str(EMBEDDED_RULESET)
    }

    #[cfg(not(feature = "embedded-rules"))]
    pub fn load_embedded() -> SeedResult<RuleSet> {
        Err(SeedError::RuleLoadError(
            "未启用 embedded-rules 特性，请通过 --rules 指定规则文件".to_string(),
        ))
    }

    /// 解析并校验规则文档
    pub fn parse_str(content: &str) -> SeedResult<RuleSet> {
        let ruleset: RuleSet = serde_json::from_str(content)?;
        Self::validate(&ruleset)?;
        debug!(
            "规则集解析成功：版本={}，来源={}，规则数={}",
            ruleset.version,
            ruleset.source,
            ruleset.stratagems.len()
        );
        Ok(ruleset)
    }

    // 名称是入库主键：不能为空；重名仅告警，后者覆盖前者
    fn validate(ruleset: &RuleSet) -> SeedResult<()> {
        let mut seen = HashSet::new();
        for (idx, stratagem) in ruleset.stratagems.iter().enumerate() {
            if stratagem.name.trim().is_empty() {
                return Err(SeedError::InvalidInput(format!(
                    "第 {} 条规则名称为空",
                    idx + 1
                )));
            }
            if !seen.insert(stratagem.name.as_str()) {
                warn!("规则名称重复：{}，后出现的记录将覆盖先前记录", stratagem.name);
            }
        }
        Ok(())
    }
}
