//! 入库结果与控制台报告

use std::fmt;

use crate::classifier::Phases;

/// 单条规则的处理状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Created,
    Updated,
    Failed(String),
}

/// 单条规则的处理结果
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub name: String,
    // 归一化失败时为 None
    pub phases: Option<Phases>,
    pub calculator_relevant: bool,
    pub status: RecordStatus,
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            RecordStatus::Failed(reason) => write!(f, "❌ {}：{}", self.name, reason),
            status => {
                let action = if *status == RecordStatus::Created { "新建" } else { "更新" };
                write!(f, "✅ {} ", self.name)?;
                if let Some(phases) = &self.phases {
                    write!(f, "[{}] ", phases)?;
                }
                if self.calculator_relevant {
                    f.write_str("[calculator] ")?;
                }
                write!(f, "({})", action)
            }
        }
    }
}

/// 整次入库的汇总
#[derive(Debug, Clone)]
pub struct SeedReport {
    pub records: Vec<RecordOutcome>,
    pub total_rows: u64,
    pub calculator_rows: u64,
}

impl SeedReport {
    pub fn created(&self) -> usize {
        self.count_status(|s| *s == RecordStatus::Created)
    }

    pub fn updated(&self) -> usize {
        self.count_status(|s| *s == RecordStatus::Updated)
    }

    pub fn failed(&self) -> usize {
        self.count_status(|s| matches!(s, RecordStatus::Failed(_)))
    }

    pub fn succeeded(&self) -> usize {
        self.records.len() - self.failed()
    }

    fn count_status(&self, pred: impl Fn(&RecordStatus) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.status)).count()
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }
        writeln!(f, "========================================")?;
        writeln!(
            f,
            "处理 {} 条：新建 {}，更新 {}，失败 {}",
            self.records.len(),
            self.created(),
            self.updated(),
            self.failed()
        )?;
        write!(
            f,
            "📊 表内共 {} 行，其中参与计算器 {} 行",
            self.total_rows, self.calculator_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify_phases;

    fn outcome(name: &str, timing: &str, relevant: bool, status: RecordStatus) -> RecordOutcome {
        RecordOutcome {
            name: name.to_string(),
            phases: Some(classify_phases(timing)),
            calculator_relevant: relevant,
            status,
        }
    }

    #[test]
    fn test_record_lines() {
        let ok = outcome("Grenade", "Your Shooting phase.", true, RecordStatus::Created);
        assert_eq!(ok.to_string(), "✅ Grenade [Shooting] [calculator] (新建)");

        let updated = outcome("Rapid Ingress", "Your opponent's Movement phase.", false, RecordStatus::Updated);
        assert_eq!(updated.to_string(), "✅ Rapid Ingress [Movement] (更新)");

        let failed = RecordOutcome {
            name: "Broken".to_string(),
            phases: None,
            calculator_relevant: false,
            status: RecordStatus::Failed("disk full".to_string()),
        };
        assert_eq!(failed.to_string(), "❌ Broken：disk full");
    }

    #[test]
    fn test_summary_counts() {
        let report = SeedReport {
            records: vec![
                outcome("A", "", true, RecordStatus::Created),
                outcome("B", "", false, RecordStatus::Updated),
                outcome("C", "", false, RecordStatus::Failed("x".to_string())),
            ],
            total_rows: 2,
            calculator_rows: 1,
        };

        assert_eq!(report.created(), 1);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 2);

        let rendered = report.to_string();
        assert_eq!(rendered.lines().count(), 6);
        assert!(rendered.contains("处理 3 条：新建 1，更新 1，失败 1"));
        assert!(rendered.ends_with("📊 表内共 2 行，其中参与计算器 1 行"));
    }
}
