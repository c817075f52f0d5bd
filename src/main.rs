use crate::cancel::CancelFlag;
use crate::config::Config;
use crate::git::CloneMethod;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

mod cancel;
mod config;
mod git;
mod gitlab;
mod project;

#[derive(Parser, Debug)]
#[clap(
    name = "gitlab-mirror",
    about = "Clone every project visible to a GitLab API token into a local directory tree"
)]
struct Opts {
    /// Path to the YAML configuration file
    #[clap(long, default_value = "config.yml")]
    config: PathBuf,
    /// Clone over "https" or "ssh", overriding the configuration file
    #[clap(long)]
    clone_method: Option<CloneMethod>,
}

async fn run(opts: Opts) -> Result<()> {
    let config = Config::load(&opts.config)?;
    config.verify()?;
    let clone_method = opts.clone_method.unwrap_or(config.clone_method);

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received, stopping after the current operation");
                cancel.cancel();
            }
        });
    }

    let client = gitlab::make_http_client(&config.api_key)?;
    let catalog = gitlab::fetch_projects(&client, &config.base_url, &cancel).await?;

    let start = Instant::now();
    let summary = git::clone_all(&catalog, &config.output, clone_method, &cancel)?;
    log::debug!("Finished cloning: duration={:?}", start.elapsed());

    println!("{}", summary);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    if let Err(err) = run(opts).await {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}
