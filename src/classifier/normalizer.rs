//! 规则归一化：由单条规则推导阶段、反应标记、必需关键字

use super::phase::{classify_phases, Phases};
use crate::error::{SeedError, SeedResult};
use crate::rule::model::{Stratagem, StratagemRow, REQUIRED_KEYWORD};

/// 分类结果（每次运行重新计算，不单独持久化）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub phases: Phases,
    pub is_reactive: bool,
    pub required_keywords: Vec<String>,
}

/// 归一化单条规则
///
/// 反应判定沿用粗粒度规则：时机文本中出现 "opponent" 即视为反应式。
/// `required_keyword` 限制的取值必须是字符串，否则返回 `InvalidRestriction`。
pub fn normalize(stratagem: &Stratagem) -> SeedResult<ClassificationResult> {
    let phases = classify_phases(&stratagem.timing);
    let is_reactive = stratagem.timing.to_lowercase().contains("opponent");

    let required_keywords = stratagem
        .restrictions
        .iter()
        .filter(|r| r.kind == REQUIRED_KEYWORD)
        .map(|r| {
            r.value.as_text().map(str::to_string).ok_or_else(|| {
                SeedError::InvalidRestriction {
                    name: stratagem.name.clone(),
                    kind: r.kind.clone(),
                }
            })
        })
        .collect::<SeedResult<Vec<_>>>()?;

    Ok(ClassificationResult {
        phases,
        is_reactive,
        required_keywords,
    })
}

/// 组装入库行，附带规则集的版本与来源
pub fn build_row(
    stratagem: &Stratagem,
    classification: ClassificationResult,
    version: &str,
    source: &str,
) -> StratagemRow {
    StratagemRow {
        name: stratagem.name.clone(),
        cp_cost: stratagem.cp_cost,
        category: stratagem.category.clone(),
        timing: stratagem.timing.clone(),
        target: stratagem.target.clone(),
        effect: stratagem.effect.clone(),
        restrictions: stratagem.restrictions.clone(),
        phases: classification.phases,
        is_reactive: classification.is_reactive,
        required_keywords: classification.required_keywords,
        calculator_effect: stratagem.calculator_effect.clone(),
        is_calculator_relevant: stratagem.is_calculator_relevant(),
        version: version.to_string(),
        source: source.to_string(),
    }
}
