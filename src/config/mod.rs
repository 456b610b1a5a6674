pub mod routes_config;

pub use routes_config::RoutesConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "warehouse-routes")]
#[command(about = "Build static multi-storehouse route files from remote and local sources")]
pub struct CliConfig {
    /// 路由 TOML 配置檔路徑
    #[arg(short, long, default_value = "config/routes.toml")]
    pub config: String,

    /// 讀取來源與寫出產物的根目錄
    #[arg(long, default_value = ".")]
    pub root: String,

    /// 代入公開 URL 模板的倉庫 (owner/repo)
    #[arg(long, default_value = "your-user/multi-warehouse-action")]
    pub public_repo: String,

    /// 代入公開 URL 模板的分支
    #[arg(long, default_value = "main")]
    pub public_branch: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[arg(long, help = "Do not refresh the README-derived source list")]
    pub skip_readme_sync: bool,

    #[arg(long, help = "Exit non-zero when any pipeline step recorded an error")]
    pub strict: bool,
}
