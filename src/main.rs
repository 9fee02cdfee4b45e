use clap::Parser;
use codecapsule::{app, cli, config, paths};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries display events; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let config_path = paths::config_path()?;
    let cfg = config::Config::load_optional(&config_path)?;
    tracing::debug!(?config_path, ?cfg, "resolved config");

    if let cli::Command::Templates = args.cmd {
        return app::cmd_templates(cfg.as_ref());
    }

    let settings = app::Settings::resolve(&args, cfg.as_ref());
    tracing::debug!(?settings, "resolved settings");

    app::cmd_run(&args.cmd, &settings, cfg.as_ref()).await
}
