//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::classifier::Phases;

/// 限制条件类型：必需关键字
pub const REQUIRED_KEYWORD: &str = "required_keyword";

/// 限制条件取值（字符串 / 字符串列表 / 布尔）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RestrictionValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl RestrictionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RestrictionValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// 单条限制条件，`kind` 不要求唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    pub value: RestrictionValue,
}

/// 战术规则定义（从规则集 JSON 解析）
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stratagem {
    pub name: String,
    #[serde(default, alias = "cost")]
    pub cp_cost: u8,
    #[serde(default)]
    pub category: String,
    #[serde(alias = "timingText")]
    pub timing: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub restrictions: Vec<Restriction>,
    // 计算器效果，原样保存，不做结构校验
    #[serde(default)]
    pub calculator_effect: Option<serde_json::Value>,
}

impl Stratagem {
    /// 是否参与伤害计算器（存在非 null 的计算器效果）
    pub fn is_calculator_relevant(&self) -> bool {
        matches!(&self.calculator_effect, Some(v) if !v.is_null())
    }
}

/// 完整规则集文档
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleSet {
    pub version: String,
    pub source: String,
    pub stratagems: Vec<Stratagem>,
}

/// 入库行：原始字段 + 推导结果 + 来源标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratagemRow {
    pub name: String,
    pub cp_cost: u8,
    pub category: String,
    pub timing: String,
    pub target: String,
    pub effect: String,
    pub restrictions: Vec<Restriction>,
    pub phases: Phases,
    pub is_reactive: bool,
    pub required_keywords: Vec<String>,
    pub calculator_effect: Option<serde_json::Value>,
    pub is_calculator_relevant: bool,
    pub version: String,
    pub source: String,
}

impl fmt::Display for StratagemRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}CP, {})", self.name, self.cp_cost, self.phases)
    }
}
