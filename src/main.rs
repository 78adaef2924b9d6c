//! Rule Commander CLI entry point.

use clap::Parser;

use rule_commander::cli::commands;
use rule_commander::cli::{Cli, Commands};
use rule_commander::infrastructure::config::ConfigLoader;
use rule_commander::infrastructure::logging::logger::LOG_FILE_PREFIX;
use rule_commander::infrastructure::logging::{prune_old_logs, LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load_with(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => rule_commander::cli::handle_error(err, cli.json),
    };

    let log_config = LogConfig::from(&config.logging);
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => logger,
        Err(err) => rule_commander::cli::handle_error(err, cli.json),
    };
    if let Some(dir) = &log_config.log_dir {
        if let Err(err) = prune_old_logs(dir, LOG_FILE_PREFIX, log_config.retention_days).await {
            tracing::warn!(error = %err, "failed to prune old log files");
        }
    }

    let result = match cli.command {
        Commands::Examples(args) => commands::examples::execute(args, config, cli.json).await,
        Commands::Rules(args) => commands::rules::execute(args, config, cli.json).await,
        Commands::Audit(args) => commands::audit::execute(args, config, cli.json).await,
        Commands::Dataset(args) => commands::dataset::execute(args, config, cli.json).await,
        Commands::Cache(args) => commands::cache::execute(args, config, cli.json).await,
        Commands::Effort(args) => commands::effort::execute(args, config, cli.json).await,
        Commands::Route(args) => commands::route::execute(args, config, cli.json).await,
        Commands::Config(args) => commands::config::execute(args, config, cli.json).await,
    };

    if let Err(err) = result {
        rule_commander::cli::handle_error(err, cli.json);
    }
}
