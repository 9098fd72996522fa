//! SQLite 存储：stratagems 表，按 name 唯一键 upsert
//! 连接放在互斥锁内，每条语句在阻塞线程池执行

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{RowFilter, RuleStore, UpsertOutcome};
use crate::error::{SeedError, SeedResult};
use crate::rule::StratagemRow;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS stratagems (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    name                   TEXT    NOT NULL UNIQUE,
    cp_cost                INTEGER NOT NULL,
    category               TEXT    NOT NULL,
    timing                 TEXT    NOT NULL,
    target                 TEXT    NOT NULL,
    effect                 TEXT    NOT NULL,
    restrictions           TEXT    NOT NULL,
    phases                 TEXT    NOT NULL,
    is_reactive            INTEGER NOT NULL,
    required_keywords      TEXT    NOT NULL,
    calculator_effect      TEXT,
    is_calculator_relevant INTEGER NOT NULL,
    version                TEXT    NOT NULL,
    source                 TEXT    NOT NULL,
    created_at             TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at             TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

const UPSERT: &str = "
INSERT INTO stratagems (
    name, cp_cost, category, timing, target, effect, restrictions, phases,
    is_reactive, required_keywords, calculator_effect, is_calculator_relevant,
    version, source
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
ON CONFLICT(name) DO UPDATE SET
    cp_cost                = excluded.cp_cost,
    category               = excluded.category,
    timing                 = excluded.timing,
    target                 = excluded.target,
    effect                 = excluded.effect,
    restrictions           = excluded.restrictions,
    phases                 = excluded.phases,
    is_reactive            = excluded.is_reactive,
    required_keywords      = excluded.required_keywords,
    calculator_effect      = excluded.calculator_effect,
    is_calculator_relevant = excluded.is_calculator_relevant,
    version                = excluded.version,
    source                 = excluded.source,
    updated_at             = CURRENT_TIMESTAMP";

const SELECT_ROW: &str = "
SELECT name, cp_cost, category, timing, target, effect, restrictions, phases,
       is_reactive, required_keywords, calculator_effect, is_calculator_relevant,
       version, source
FROM stratagems WHERE name = ?1";

/// SQLite 规则表
#[derive(Debug, Clone)]
pub struct SqliteStore {
    // close 后为 None
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件并建表
    pub async fn open(path: PathBuf) -> SeedResult<Self> {
        let conn = tokio::task::spawn_blocking(move || -> SeedResult<Connection> {
            let conn = Connection::open(&path)?;
            conn.execute_batch(CREATE_TABLE)?;
            debug!("SQLite 已就绪：{}", path.display());
            Ok(conn)
        })
        .await
        .map_err(|e| SeedError::AsyncTaskError(e.to_string()))??;

        Ok(Self::from_connection(conn))
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> SeedResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// 按名称读取一行
    pub async fn fetch(&self, name: &str) -> SeedResult<Option<StratagemRow>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(SELECT_ROW, params![name], |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, u8>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                        r.get::<_, String>(5)?,
                        r.get::<_, String>(6)?,
                        r.get::<_, String>(7)?,
                        r.get::<_, bool>(8)?,
                        r.get::<_, String>(9)?,
                        r.get::<_, Option<String>>(10)?,
                        r.get::<_, bool>(11)?,
                        r.get::<_, String>(12)?,
                        r.get::<_, String>(13)?,
                    ))
                })
                .optional()?;

            let Some((
                name,
                cp_cost,
                category,
                timing,
                target,
                effect,
                restrictions,
                phases,
                is_reactive,
                required_keywords,
                calculator_effect,
                is_calculator_relevant,
                version,
                source,
            )) = raw
            else {
                return Ok(None);
            };

            Ok(Some(StratagemRow {
                name,
                cp_cost,
                category,
                timing,
                target,
                effect,
                restrictions: serde_json::from_str(&restrictions)?,
                phases: serde_json::from_str(&phases)?,
                is_reactive,
                required_keywords: serde_json::from_str(&required_keywords)?,
                calculator_effect: calculator_effect
                    .map(|raw| serde_json::from_str(&raw))
                    .transpose()?,
                is_calculator_relevant,
                version,
                source,
            }))
        })
        .await
    }

    async fn with_conn<F, T>(&self, f: F) -> SeedResult<T>
    where
        F: FnOnce(&Connection) -> SeedResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| SeedError::StoreError(format!("连接锁已损坏：{}", e)))?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| SeedError::StoreError("SQLite 连接已关闭".to_string()))?;
            f(conn)
        })
        .await
        .map_err(|e| SeedError::AsyncTaskError(e.to_string()))?
    }
}

#[async_trait]
impl RuleStore for SqliteStore {
    async fn upsert(&self, row: &StratagemRow) -> SeedResult<UpsertOutcome> {
        let row = row.clone();
        self.with_conn(move |conn| {
            let exists = conn
                .query_row("SELECT 1 FROM stratagems WHERE name = ?1", params![row.name], |_| Ok(()))
                .optional()?
                .is_some();

            let calculator_effect = row
                .calculator_effect
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            conn.execute(
                UPSERT,
                params![
                    row.name,
                    row.cp_cost,
                    row.category,
                    row.timing,
                    row.target,
                    row.effect,
                    serde_json::to_string(&row.restrictions)?,
                    serde_json::to_string(&row.phases)?,
                    row.is_reactive,
                    serde_json::to_string(&row.required_keywords)?,
                    calculator_effect,
                    row.is_calculator_relevant,
                    row.version,
                    row.source,
                ],
            )?;

            Ok(if exists {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Created
            })
        })
        .await
    }

    async fn count(&self, filter: RowFilter) -> SeedResult<u64> {
        let sql = match filter {
            RowFilter::All => "SELECT COUNT(*) FROM stratagems",
            RowFilter::CalculatorRelevant => {
                "SELECT COUNT(*) FROM stratagems WHERE is_calculator_relevant = 1"
            }
        };
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(sql, [], |r| r.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn close(&self) -> SeedResult<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> SeedResult<()> {
            let taken = conn
                .lock()
                .map_err(|e| SeedError::StoreError(format!("连接锁已损坏：{}", e)))?
                .take();
            if let Some(conn) = taken {
                conn.close().map_err(|(_, e)| SeedError::SqliteError(e))?;
                debug!("SQLite 连接已释放");
            }
            Ok(())
        })
        .await
        .map_err(|e| SeedError::AsyncTaskError(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Phase;
    use crate::store::memory::tests::sample_row;

    #[tokio::test]
    async fn test_upsert_is_keyed_by_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        let row = sample_row("Fire Overwatch", "Your opponent's Movement phase or Charge phase.", true);

        assert_eq!(store.upsert(&row).await.unwrap(), UpsertOutcome::Created);
        assert_eq!(store.upsert(&row).await.unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.count(RowFilter::All).await.unwrap(), 1);
        assert_eq!(store.count(RowFilter::CalculatorRelevant).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_returns_stored_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut row = sample_row("Fire Overwatch", "Your opponent's Movement phase or Charge phase.", true);
        row.required_keywords = vec!["INFANTRY".to_string()];
        store.upsert(&row).await.unwrap();

        let fetched = store.fetch("Fire Overwatch").await.unwrap().unwrap();
        assert_eq!(fetched, row);
        assert_eq!(fetched.phases.as_slice(), &[Phase::Movement, Phase::Charge]);
        assert!(store.fetch("Unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_overwrites_mutable_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&sample_row("Grenade", "Your Shooting phase.", false)).await.unwrap();
        store.upsert(&sample_row("Grenade", "Your Fight phase.", true)).await.unwrap();

        let fetched = store.fetch("Grenade").await.unwrap().unwrap();
        assert_eq!(fetched.phases.as_slice(), &[Phase::Fight]);
        assert!(fetched.is_calculator_relevant);
        assert_eq!(store.count(RowFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("seed.db")).await.unwrap();
        store.upsert(&sample_row("Grenade", "Your Shooting phase.", false)).await.unwrap();
        store.close().await.unwrap();
        // 重复 close 无副作用
        store.close().await.unwrap();

        let err = store.count(RowFilter::All).await.unwrap_err();
        assert!(matches!(err, SeedError::StoreError(_)));

        let reopened = SqliteStore::open(dir.path().join("seed.db")).await.unwrap();
        assert_eq!(reopened.count(RowFilter::All).await.unwrap(), 1);
    }
}
