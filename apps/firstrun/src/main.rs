//! firstrun - first-run device provisioning
//!
//! Reads a locally staged app repository, installs the selected apps and
//! holds the device back until provisioning has finished, all through the
//! ops crate.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use firstrun_config::Config;
use firstrun_events::{EventReceiver, EventSender};
use firstrun_install::StagingInstaller;
use firstrun_ops::{DefaultHandlerHook, OperationResult, OpsContextBuilder};
use firstrun_types::{ColorChoice, OutputFormat};
use std::path::Path;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    // Configuration precedence: file (or defaults), environment, CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command)?;
    config.validate()?;

    let json_output = cli.global.json || config.general.default_output.is_json();
    init_tracing(json_output, cli.global.debug, &config.log_dir());
    info!(
        command = cli.command.name(),
        "Starting firstrun v{}",
        env!("CARGO_PKG_VERSION")
    );

    let (event_sender, event_receiver) = firstrun_events::channel();

    let ops_ctx = build_ops_context(event_sender, config.clone()).await?;

    let color = match cli.global.color {
        Some(color) => color,
        None if config.general.default_output == OutputFormat::Plain => ColorChoice::Never,
        None => config.general.color,
    };
    let renderer = OutputRenderer::new(json_output, color);

    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, json_output);

    let result =
        execute_command_with_events(cli.command, ops_ctx, event_receiver, &mut event_handler)
            .await?;

    renderer.render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ops_ctx: firstrun_ops::OpsCtx,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ops_ctx));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            Some(event) = event_receiver.recv() => {
                event_handler.handle_event(event);
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    ctx: firstrun_ops::OpsCtx,
) -> Result<OperationResult, CliError> {
    match command {
        Commands::List { category } => {
            let listing = firstrun_ops::list_apps(&ctx, category.as_deref()).await?;
            Ok(OperationResult::AppList(listing))
        }

        Commands::Verify => {
            let status = firstrun_ops::verify_repository(&ctx).await;
            Ok(OperationResult::RepositoryStatus(status))
        }

        Commands::Provision { category, only, .. } => {
            let report = firstrun_ops::provision_repository(&ctx, category.as_deref(), &only).await?;
            let readiness = firstrun_ops::wait_until_ready(&ctx).await;
            info!(run_id = %report.run_id, readiness = %readiness, "provisioning finished");
            Ok(OperationResult::ProvisionReport(report))
        }
    }
}

/// Build operations context with all required components
async fn build_ops_context(
    event_sender: EventSender,
    config: Config,
) -> Result<firstrun_ops::OpsCtx, CliError> {
    let installer = Arc::new(StagingInstaller::new(config.install_root()).await?);

    let mut builder = OpsContextBuilder::new()
        .with_installer(installer.clone())
        .with_event_sender(event_sender);

    if let Some(browser) = &config.provision.default_browser {
        builder = builder.with_hook(Arc::new(DefaultHandlerHook::browser(
            installer,
            browser.clone(),
        )));
    }

    Ok(builder.with_config(config).build()?)
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: &Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }

        let log_file = log_dir.join(format!(
            "firstrun-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| {
                                tracing_subscriber::EnvFilter::new(
                                    "info,firstrun=debug,firstrun_ops=debug",
                                )
                            },
                        ),
                    )
                    .init();

                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // JSON mode: keep stdout and stderr free of log lines
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("warn,firstrun=warn,firstrun_ops=warn")
                }),
            )
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(
    config: &mut Config,
    global: &cli::GlobalArgs,
    command: &Commands,
) -> Result<(), CliError> {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Some(repo) = &global.repo {
        config.repository.path.clone_from(repo);
    }

    if let Commands::Provision {
        timeout: Some(secs),
        ..
    } = command
    {
        if *secs == 0 {
            return Err(CliError::InvalidArguments(
                "--timeout must be at least one second".to_string(),
            ));
        }
        config.provision.timeout_secs = *secs;
        config.provision.poll_interval_secs = config.provision.poll_interval_secs.min(*secs);
    }

    Ok(())
}
