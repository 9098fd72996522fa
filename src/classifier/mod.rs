//! 分类模块：触发阶段分类与规则归一化（纯函数，无 I/O）
pub mod phase;
pub mod normalizer;

pub use self::phase::{classify_phases, Phase, Phases};
pub use self::normalizer::{build_row, normalize, ClassificationResult};
