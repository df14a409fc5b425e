pub mod cli;
pub mod errors;
pub mod loader;

use std::path::Path;

use errors::FrontendError;
use studio_config::AppConfig;
use tracing::info;

/// 启动 CLI 演示或返回错误。
pub fn run_cli_demo(config: &AppConfig) -> Result<(), FrontendError> {
    run_cli_demo_with_gallery(config, None)
}

/// 允许显式指定展厅快照的 CLI 演示。
pub fn run_cli_demo_with_gallery(
    config: &AppConfig,
    gallery: Option<&Path>,
) -> Result<(), FrontendError> {
    info!("启动 CLI 演示前端");
    let report = cli::run_demo(config, gallery)?;
    cli::print_report(&report);
    Ok(())
}
