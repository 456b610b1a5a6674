use clap::Parser;
use std::path::Path;
use warehouse_routes::app::refresh_readme_sources;
use warehouse_routes::utils::error::{ErrorSeverity, RouteError};
use warehouse_routes::utils::{logger, validation::Validate};
use warehouse_routes::{CliConfig, HttpFetcher, LocalStorage, RouteBuilder, RoutesConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting warehouse-routes");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let root = Path::new(&cli.root);
    let config = match RoutesConfig::from_file(root.join(&cli.config)) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    let fetcher = match HttpFetcher::new(&config.defaults) {
        Ok(fetcher) => fetcher,
        Err(e) => fail(&e),
    };
    let storage = LocalStorage::new(root);

    if cli.skip_readme_sync {
        tracing::info!("⏭️ README sync skipped");
    } else if let Err(e) = refresh_readme_sources(&config, &fetcher, &storage).await {
        tracing::warn!("⚠️ README sync failed, keeping the previous source list: {}", e);
    }

    let mut builder = RouteBuilder::new(config, storage, fetcher, &cli.public_repo, &cli.public_branch);
    let report = match builder.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(
                "❌ Route build failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            fail(&e);
        }
    };

    println!(
        "✅ Built {} pipelines, {} artifacts written under {}",
        report.records.len(),
        report.artifacts.len(),
        root.display()
    );
    for record in report.failed_steps() {
        if let Some(error) = &record.error {
            println!("⚠️ {} ({}): {}", record.id, record.kind, error);
        }
        for failure in &record.expansion_errors {
            println!("⚠️ {} expansion: {}", record.id, failure);
        }
    }

    if cli.strict && report.has_errors() {
        eprintln!("❌ {} pipelines recorded errors (--strict)", report.failed_steps().len());
        std::process::exit(1);
    }

    Ok(())
}

fn fail(e: &RouteError) -> ! {
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
