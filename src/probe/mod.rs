//! 延迟探测：向 chat/completions 服务依次发送三种请求，统计耗时
//! 仅用于诊断，请求之间互不依赖，失败不影响后续请求

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::ProbeConfig;
use crate::error::{SeedError, SeedResult};
use crate::utils::preview_compact;

/// 预览最大字符数
const PREVIEW_LEN: usize = 120;

const CLASSIFY_PROMPT: &str = "Classify the trigger phase of this stratagem timing. \
Answer with one word (Command, Movement, Shooting, Charge, Fight, Morale or Any): \
\"Your opponent's Shooting phase, just after an enemy unit has selected its targets.\"";

/// 请求形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Classification,
    Chat,
    ToolChat,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 3] = [ProbeKind::Classification, ProbeKind::Chat, ProbeKind::ToolChat];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Classification => "classification",
            ProbeKind::Chat => "chat",
            ProbeKind::ToolChat => "tool-chat",
        }
    }

    /// 构造请求体
    pub fn payload(&self, model: &str) -> Value {
        match self {
            ProbeKind::Classification => json!({
                "model": model,
                "max_tokens": 16,
                "messages": [
                    {"role": "user", "content": CLASSIFY_PROMPT}
                ]
            }),
            ProbeKind::Chat => json!({
                "model": model,
                "max_tokens": 256,
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant for tabletop wargame players."},
                    {"role": "user", "content": "In two sentences, when should I spend command points on Fire Overwatch?"}
                ]
            }),
            ProbeKind::ToolChat => json!({
                "model": model,
                "max_tokens": 256,
                "messages": [
                    {"role": "user", "content": "Look up the Grenade stratagem and tell me its cost."}
                ],
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "lookup_stratagem",
                        "description": "Look up a stratagem by its exact name.",
                        "parameters": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string", "description": "Stratagem name"}
                            },
                            "required": ["name"]
                        }
                    }
                }]
            }),
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次请求结果
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub kind: ProbeKind,
    pub elapsed: Duration,
    // 请求未得到响应时为 None
    pub status: Option<u16>,
    pub preview: String,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "ERR".to_string());
        write!(
            f,
            "[{}] {} | {:.1} ms | {}",
            self.kind,
            status,
            self.elapsed.as_secs_f64() * 1000.0,
            self.preview
        )
    }
}

/// 从响应体中取出可展示的文本：优先消息内容，其次工具调用，最后原始 JSON
pub fn extract_preview(body: &Value) -> String {
    let message = &body["choices"][0]["message"];

    let text = match message["content"].as_str() {
        Some(content) if !content.trim().is_empty() => content.to_string(),
        _ => match message["tool_calls"][0]["function"].as_object() {
            Some(function) => format!(
                "tool_call {}({})",
                function.get("name").and_then(Value::as_str).unwrap_or("?"),
                function.get("arguments").and_then(Value::as_str).unwrap_or("")
            ),
            None => body.to_string(),
        },
    };

    preview_compact(&text, PREVIEW_LEN).to_string()
}

/// 延迟探测器
pub struct LatencyProbe {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl LatencyProbe {
    /// 从环境变量读取凭据并构建客户端
    pub fn new(config: &ProbeConfig) -> SeedResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SeedError::MissingCredential(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ProbeConfig, api_key: String) -> SeedResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let endpoint = config.base_url.join("chat/completions")?;
        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// 依次执行三种请求
    pub async fn run(&self) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(ProbeKind::ALL.len());
        for kind in ProbeKind::ALL {
            outcomes.push(self.probe(kind).await);
        }
        outcomes
    }

    /// 执行单种请求，错误折叠进结果
    pub async fn probe(&self, kind: ProbeKind) -> ProbeOutcome {
        debug!("发送 [{}] 请求：{}", kind, self.endpoint);
        let start = Instant::now();
        let result = self.send(kind).await;
        let elapsed = start.elapsed();

        match result {
            Ok((status, body)) => ProbeOutcome {
                kind,
                elapsed,
                status: Some(status),
                preview: extract_preview(&body),
            },
            Err(e) => {
                warn!("[{}] 请求失败：{}", kind, e);
                ProbeOutcome {
                    kind,
                    elapsed,
                    status: None,
                    preview: preview_compact(&e.to_string(), PREVIEW_LEN).to_string(),
                }
            }
        }
    }

    async fn send(&self, kind: ProbeKind) -> SeedResult<(u16, Value)> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .header("User-Agent", concat!("stratseed/", env!("CARGO_PKG_VERSION")))
            .json(&kind.payload(&self.model))
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        // 非 JSON 响应（如网关错误页）按纯文本展示
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, body))
    }
}
