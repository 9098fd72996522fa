//! 入库模块：逐条归一化规则并写入存储
pub mod report;

use std::io::Write;

use tracing::{debug, info, warn};

use crate::classifier::{build_row, normalize, Phases};
use crate::config::GlobalConfig;
use crate::error::SeedResult;
use crate::rule::{RuleLoader, RuleSet, Stratagem};
use crate::store::{open_store, RowFilter, RuleStore, UpsertOutcome};

pub use self::report::{RecordOutcome, RecordStatus, SeedReport};

/// 规则入库器
pub struct Seeder;

impl Seeder {
    /// 顺序处理全部规则
    ///
    /// 单条失败（归一化或写入）只记录并继续，不重试、不回滚；
    /// 仅末尾的计数查询失败会作为致命错误返回。
    pub async fn run(ruleset: &RuleSet, store: &dyn RuleStore) -> SeedResult<SeedReport> {
        info!(
            "开始入库：版本={}，来源={}，规则数={}",
            ruleset.version,
            ruleset.source,
            ruleset.stratagems.len()
        );

        let mut records = Vec::with_capacity(ruleset.stratagems.len());
        for stratagem in &ruleset.stratagems {
            let outcome = Self::seed_one(ruleset, stratagem, store).await;
            records.push(outcome);
        }

        let total_rows = store.count(RowFilter::All).await?;
        let calculator_rows = store.count(RowFilter::CalculatorRelevant).await?;

        let report = SeedReport {
            records,
            total_rows,
            calculator_rows,
        };
        info!(
            "入库结束：成功 {}，失败 {}，表内共 {} 行",
            report.succeeded(),
            report.failed(),
            total_rows
        );
        Ok(report)
    }

    /// 完整入库流程：加载规则集、打开存储、逐条写入、释放存储、输出报告
    ///
    /// 返回 `Err` 表示致命失败（规则集不可用、存储打不开、计数或释放失败），
    /// 调用方应以非零状态退出；单条记录失败只体现在报告里。
    pub async fn seed(config: &GlobalConfig, out: &mut dyn Write) -> SeedResult<SeedReport> {
        let ruleset = RuleLoader::load(config).await?;
        let store = open_store(&config.store).await?;
        info!("存储已打开：{}", config.store);

        Self::seed_into(&ruleset, store.as_ref(), out).await
    }

    /// 写入已打开的存储，无论结果如何都会释放存储句柄
    ///
    /// 报告先于释放结果输出，释放失败时已写入的明细仍可见。
    pub async fn seed_into(
        ruleset: &RuleSet,
        store: &dyn RuleStore,
        out: &mut dyn Write,
    ) -> SeedResult<SeedReport> {
        let result = Self::run(ruleset, store).await;
        // 快照存储在此落盘
        let closed = store.close().await;

        match result {
            Ok(report) => {
                writeln!(out, "{}", report)?;
                out.flush()?;
                if let Err(e) = closed {
                    warn!("释放存储失败：{}", e);
                    return Err(e);
                }
                Ok(report)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("释放存储失败：{}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn seed_one(ruleset: &RuleSet, stratagem: &Stratagem, store: &dyn RuleStore) -> RecordOutcome {
        let calculator_relevant = stratagem.is_calculator_relevant();

        let classification = match normalize(stratagem) {
            Ok(c) => c,
            Err(e) => {
                warn!("规则 [{}] 归一化失败：{}", stratagem.name, e);
                return RecordOutcome {
                    name: stratagem.name.clone(),
                    phases: None,
                    calculator_relevant,
                    status: RecordStatus::Failed(e.to_string()),
                };
            }
        };
        let phases: Phases = classification.phases.clone();
        let row = build_row(stratagem, classification, &ruleset.version, &ruleset.source);

        let status = match store.upsert(&row).await {
            Ok(UpsertOutcome::Created) => RecordStatus::Created,
            Ok(UpsertOutcome::Updated) => RecordStatus::Updated,
            Err(e) => {
                warn!("规则 [{}] 写入失败：{}", stratagem.name, e);
                RecordStatus::Failed(e.to_string())
            }
        };
        debug!("规则 [{}] 处理完成：{:?}", stratagem.name, status);

        RecordOutcome {
            name: stratagem.name.clone(),
            phases: Some(phases),
            calculator_relevant,
            status,
        }
    }
}
