//! stratseed - 战术规则入库工具：推导触发阶段并按名称写入存储

// 导出全局错误类型
pub use self::error::{SeedError, SeedResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig, ProbeConfig};

// 导出规则模块核心接口
pub use self::rule::{
    Restriction, RestrictionValue, RuleLoader, RuleSet, Stratagem, StratagemRow,
};

// 导出分类模块核心接口
pub use self::classifier::{classify_phases, normalize, ClassificationResult, Phase, Phases};

// 导出存储模块核心接口
pub use self::store::{
    open_store, FileStore, MemoryStore, RowFilter, RuleStore, SqliteStore, StoreLocation,
    UpsertOutcome,
};

// 导出入库与探测接口
pub use self::seeder::{RecordOutcome, RecordStatus, SeedReport, Seeder};
pub use self::probe::{LatencyProbe, ProbeKind, ProbeOutcome};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod classifier;
pub mod store;
pub mod seeder;
pub mod probe;
pub mod utils;
