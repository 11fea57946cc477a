//! Classifies every unprocessed abstract of a CSV dataset against the configured
//! keyword groups, checkpointing into `<dataset>_copy.csv`.
//!
//! ```text
//! $ abstract_classifier --config config.yaml
//! $ abstract_classifier -c config.yaml --dataset papers.csv --concurrency 4 --port 8080
//! ```
//!
//! Re-running the same command resumes where the last checkpoint left off.

use std::path::PathBuf;

use abstract_classifier::prelude::*;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "abstract_classifier", version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, short = 'c', value_name = "PATH", default_value = "config.yaml")]
    config: PathBuf,

    /// Overrides `dataset_path`
    #[arg(long, value_name = "PATH")]
    dataset: Option<PathBuf>,

    /// Records classified at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Completions between checkpoints
    #[arg(long)]
    save_interval: Option<usize>,

    /// Completion endpoint host
    #[arg(long)]
    host: Option<String>,

    /// Completion endpoint port
    #[arg(long)]
    port: Option<u16>,

    /// trace, debug, info, warn or error
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<tracing::Level>,

    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Log to the terminal only
    #[arg(long)]
    no_log_file: bool,
}

impl Cli {
    fn apply(self, mut config: ClassifierConfig) -> ClassifierConfig {
        if let Some(dataset) = self.dataset {
            config = config.with_dataset_path(dataset);
        }
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(save_interval) = self.save_interval {
            config = config.with_save_interval(save_interval);
        }
        if let Some(host) = self.host {
            config = config.with_api_host(host);
        }
        if let Some(port) = self.port {
            config = config.with_api_port(port);
        }
        if let Some(level) = self.log_level {
            config = config.log_level(level);
        }
        if let Some(dir) = self.log_dir {
            config = config.log_dir(dir);
        }
        if self.no_log_file {
            config = config.log_to_file(false);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ClassifierConfig::from_yaml_path(&cli.config)?;
    let config = cli.apply(config);
    config.validate()?;

    let classifier = AbstractClassifier::from_config(config)?;
    let mut store = classifier.open_csv_store()?;
    let summary = classifier.run(&mut store).await?;

    println!("{summary}");
    println!("results written to {}", store.path().display());
    Ok(())
}
