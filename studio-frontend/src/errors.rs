use studio_engine::errors::EngineError;
use studio_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("演示会话失败: {0}")]
    Engine(#[from] EngineError),
    #[error("写入落位日志失败: {0}")]
    Journal(#[from] IoError),
}
