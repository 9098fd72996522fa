//! 存储模块：按名称 upsert 的窄接口及其后端实现
pub mod memory;
pub mod file;
pub mod sqlite;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{SeedError, SeedResult};
use crate::rule::StratagemRow;

pub use self::file::FileStore;
pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// 计数过滤条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    All,
    CalculatorRelevant,
}

impl RowFilter {
    pub fn matches(&self, row: &StratagemRow) -> bool {
        match self {
            RowFilter::All => true,
            RowFilter::CalculatorRelevant => row.is_calculator_relevant,
        }
    }
}

/// 规则存储接口
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// 按名称插入或覆盖一行
    async fn upsert(&self, row: &StratagemRow) -> SeedResult<UpsertOutcome>;

    /// 统计满足条件的行数
    async fn count(&self, filter: RowFilter) -> SeedResult<u64>;

    /// 释放连接 / 落盘
    async fn close(&self) -> SeedResult<()>;
}

/// 存储位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Sqlite(PathBuf),
    MsgPackFile(PathBuf),
}

impl FromStr for StoreLocation {
    type Err = SeedError;

    /// 支持 `memory`、`sqlite:<path>`、`mp:<path>`，或按扩展名推断
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("memory") {
            return Ok(StoreLocation::Memory);
        }
        if let Some(path) = s.strip_prefix("sqlite:") {
            return Ok(StoreLocation::Sqlite(prefixed_path(s, path)?));
        }
        if let Some(path) = s.strip_prefix("mp:") {
            return Ok(StoreLocation::MsgPackFile(prefixed_path(s, path)?));
        }

        let path = PathBuf::from(s);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("db") | Some("sqlite") | Some("sqlite3") => Ok(StoreLocation::Sqlite(path)),
            Some("mp") => Ok(StoreLocation::MsgPackFile(path)),
            _ => Err(SeedError::InvalidInput(format!(
                "无法识别的存储位置：{}（可用 memory / sqlite:<path> / mp:<path>）",
                s
            ))),
        }
    }
}

// 前缀后的路径不能为空，否则 SQLite 会静默打开临时库
fn prefixed_path(raw: &str, path: &str) -> SeedResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(SeedError::InvalidInput(format!("存储位置缺少路径：{}", raw)));
    }
    Ok(PathBuf::from(path))
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Memory => f.write_str("memory"),
            StoreLocation::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
            StoreLocation::MsgPackFile(path) => write!(f, "mp:{}", path.display()),
        }
    }
}

/// 打开存储句柄（进程内只打开一次，由调用方负责 close）
pub async fn open_store(location: &StoreLocation) -> SeedResult<Box<dyn RuleStore>> {
    debug!("打开存储：{}", location);
    let store: Box<dyn RuleStore> = match location {
        StoreLocation::Memory => Box::new(MemoryStore::new()),
        StoreLocation::Sqlite(path) => Box::new(SqliteStore::open(path.clone()).await?),
        StoreLocation::MsgPackFile(path) => Box::new(FileStore::open(path.clone()).await?),
    };
    Ok(store)
}
