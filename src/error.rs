//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum SeedError {
    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则 [{name}] 的限制条件 {kind} 取值不是字符串")]
    InvalidRestriction { name: String, kind: String },

    // 存储相关错误
    #[error("存储操作失败：{0}")]
    StoreError(String),
    #[error("SQLite 操作失败：{0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),
    #[error("环境变量 {0} 未设置，无法读取 API 凭据")]
    MissingCredential(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
    #[error("异步任务执行失败：{0}")]
    AsyncTaskError(String),
}

// 全局Result类型
pub type SeedResult<T> = Result<T, SeedError>;
