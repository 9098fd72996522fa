//! 规则模块：负责规则集的加载与数据模型定义
pub mod model;
pub mod loader;

// 导出核心接口
pub use self::model::{
    Restriction, RestrictionValue, RuleSet, Stratagem, StratagemRow, REQUIRED_KEYWORD,
};
pub use self::loader::RuleLoader;
