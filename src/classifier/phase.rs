//! 触发阶段分类器
//! 对规则时机文本做大小写无关的阶段短语匹配，输出有序、非空的阶段集合

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 回合阶段标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Command,
    Movement,
    Shooting,
    Charge,
    Fight,
    Morale,
    Any,
}

/// 固定输出顺序
const PHASE_NAMES: [(&str, Phase); 6] = [
    ("command", Phase::Command),
    ("movement", Phase::Movement),
    ("shooting", Phase::Shooting),
    ("charge", Phase::Charge),
    ("fight", Phase::Fight),
    ("morale", Phase::Morale),
];

/// 共用一个 "phase" 的阶段名串，如 "movement, shooting or charge phase"
static PHASE_RUN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:command|movement|shooting|charge|fight|morale)(?:(?:\s*,\s*(?:(?:or|and)\s+)?|\s+(?:or|and)\s+)(?:command|movement|shooting|charge|fight|morale))*\s+phase",
    )
    .expect("阶段串正则合法")
});

static PHASE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"command|movement|shooting|charge|fight|morale").expect("阶段名正则合法"));

const ANY_PHASE_PHRASE: &str = "any phase";

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Command => "Command",
            Phase::Movement => "Movement",
            Phase::Shooting => "Shooting",
            Phase::Charge => "Charge",
            Phase::Fight => "Fight",
            Phase::Morale => "Morale",
            Phase::Any => "Any",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段集合
/// 不变量：非空；包含 `Any` 时只含 `Any`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Phase>", into = "Vec<Phase>")]
pub struct Phases(Vec<Phase>);

impl Phases {
    pub fn any() -> Self {
        Self(vec![Phase::Any])
    }

    pub fn is_any(&self) -> bool {
        self.0 == [Phase::Any]
    }

    pub fn as_slice(&self) -> &[Phase] {
        &self.0
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.0.contains(&phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phase> {
        self.0.iter()
    }

    /// 阶段名列表（入库用）
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Phase::as_str).collect()
    }
}

impl TryFrom<Vec<Phase>> for Phases {
    type Error = String;

    fn try_from(phases: Vec<Phase>) -> Result<Self, Self::Error> {
        if phases.is_empty() {
            return Err("阶段集合不能为空".to_string());
        }
        if phases.contains(&Phase::Any) && phases.len() > 1 {
            return Err("Any 不能与其他阶段同时出现".to_string());
        }
        Ok(Self(phases))
    }
}

impl From<Phases> for Vec<Phase> {
    fn from(phases: Phases) -> Self {
        phases.0
    }
}

impl fmt::Display for Phases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join("/"))
    }
}

/// 从时机文本推导触发阶段
///
/// 1. 含 "any phase" 直接返回 `{Any}`
/// 2. 否则找出所有以 "phase" 结尾的阶段名串，串内每个阶段名都命中
/// 3. 命中结果按固定顺序输出；全部未命中时返回 `{Any}`
pub fn classify_phases(timing: &str) -> Phases {
    let lower = timing.to_lowercase();

    if lower.contains(ANY_PHASE_PHRASE) {
        return Phases::any();
    }

    let mut hit = [false; PHASE_NAMES.len()];
    for run in PHASE_RUN_REGEX.find_iter(&lower) {
        for name in PHASE_NAME_REGEX.find_iter(run.as_str()) {
            if let Some(idx) = PHASE_NAMES.iter().position(|(n, _)| *n == name.as_str()) {
                hit[idx] = true;
            }
        }
    }

    let matched: Vec<Phase> = PHASE_NAMES
        .iter()
        .zip(hit)
        .filter(|(_, hit)| *hit)
        .map(|((_, phase), _)| *phase)
        .collect();

    if matched.is_empty() {
        Phases::any()
    } else {
        Phases(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_phase_short_circuits() {
        let phases = classify_phases("Any phase, just after an enemy unit shoots.");
        assert!(phases.is_any());

        // 即便同时出现具体阶段，也只返回 Any
        let phases = classify_phases("ANY PHASE except the Fight phase");
        assert_eq!(phases.as_slice(), &[Phase::Any]);
    }

    #[test]
    fn test_no_phase_language_defaults_to_any() {
        assert!(classify_phases("Once per battle round.").is_any());
        assert!(classify_phases("").is_any());
    }

    #[test]
    fn test_single_phase() {
        let phases = classify_phases("at the start of the Movement phase");
        assert_eq!(phases.as_slice(), &[Phase::Movement]);
    }

    #[test]
    fn test_multiple_phases_keep_fixed_order() {
        let phases = classify_phases("in either the Charge or Fight phase");
        assert_eq!(phases.as_slice(), &[Phase::Charge, Phase::Fight]);

        // 文本中先出现 Fight，输出仍按固定顺序
        let phases = classify_phases("Your Fight phase or your opponent's Charge phase");
        assert_eq!(phases.as_slice(), &[Phase::Charge, Phase::Fight]);
    }

    #[test]
    fn test_each_phrase_is_recognised() {
        let cases = [
            ("your Command phase", Phase::Command),
            ("your Movement phase", Phase::Movement),
            ("your Shooting phase", Phase::Shooting),
            ("your Charge phase", Phase::Charge),
            ("the Fight phase", Phase::Fight),
            ("the Morale phase", Phase::Morale),
        ];
        for (text, expected) in cases {
            assert_eq!(classify_phases(text).as_slice(), &[expected], "{}", text);
        }
    }

    #[test]
    fn test_shared_phase_word_tags_every_name() {
        let phases = classify_phases("at the start of any Movement or Shooting phase");
        assert_eq!(phases.as_slice(), &[Phase::Movement, Phase::Shooting]);

        let phases = classify_phases("your opponent's Movement or Charge phase");
        assert_eq!(phases.as_slice(), &[Phase::Movement, Phase::Charge]);

        // 逗号列表，输出仍按固定顺序
        let phases = classify_phases("the Charge, Shooting or Movement phase");
        assert_eq!(phases.as_slice(), &[Phase::Movement, Phase::Shooting, Phase::Charge]);

        let phases = classify_phases("your Command and Morale phase");
        assert_eq!(phases.as_slice(), &[Phase::Command, Phase::Morale]);
    }

    #[test]
    fn test_bare_phase_word_does_not_match() {
        // 阶段名后没有 "phase" 不算命中
        assert!(classify_phases("after an enemy unit makes a Charge roll").is_any());
        assert!(classify_phases("when a unit is selected to fight").is_any());

        // 不与 "phase" 相连的阶段名不会被后面的短语带上
        let phases = classify_phases("after making a Charge move, in your Fight phase");
        assert_eq!(phases.as_slice(), &[Phase::Fight]);
    }

    #[test]
    fn test_phases_rejects_invalid_sets() {
        assert!(Phases::try_from(Vec::new()).is_err());
        assert!(Phases::try_from(vec![Phase::Any, Phase::Fight]).is_err());
        assert!(Phases::try_from(vec![Phase::Command, Phase::Fight]).is_ok());
    }

    #[test]
    fn test_phases_serialize_as_names() {
        let phases = classify_phases("your opponent's Shooting phase or your Fight phase");
        let json = serde_json::to_string(&phases).unwrap();
        assert_eq!(json, r#"["Shooting","Fight"]"#);
        assert_eq!(phases.to_string(), "Shooting/Fight");
    }
}
