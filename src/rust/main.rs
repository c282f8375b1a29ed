use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use toxiscore::{
    interactive, loader, server, BuiltinModel, Config, ToxicityClassifier,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model directory to try before the default local directory
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Never download the fallback model
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Classify comments given on the command line
    Classify {
        /// Print verdicts as JSON, one per line
        #[arg(long)]
        json: bool,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Check comments typed at a prompt
    Interactive,
    /// Download the fallback model into the cache
    Download {
        /// Force a fresh download of the model files
        #[arg(short, long)]
        fresh: bool,
    },
    /// Show which model is loaded and how its outputs are read
    Info,
}

async fn load(config: &Config) -> anyhow::Result<ToxicityClassifier> {
    let start = Instant::now();
    let classifier = loader::load_classifier(config)
        .await
        .context("no usable toxicity model")?;
    info!("Model loaded from {} in {:.2?}", classifier.model_path, start.elapsed());
    Ok(classifier)
}

async fn download(config: &Config, fresh: bool) -> anyhow::Result<()> {
    let manager = loader::model_manager(config)?;
    let info = BuiltinModel::default().get_model_info(config.fallback_url.as_deref());

    if fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(&info.name)?;
    }
    let dir = manager.ensure_model_downloaded(&info).await?;
    println!("{}", dir.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    toxiscore::init_logger();
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if args.model_dir.is_some() {
        config.model_dir = args.model_dir;
    }
    config.offline |= args.offline;

    match args.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            let addr = config.bind_addr()?;
            let classifier = load(&config).await?;
            server::serve(addr, server::AppState::new(Arc::new(classifier))).await?;
        }
        Command::Classify { json, text } => {
            let classifier = load(&config).await?;
            for comment in &text {
                let verdict = classifier.classify(comment)?;
                if json {
                    println!("{}", serde_json::to_string(&verdict)?);
                } else {
                    println!("{}\n  {}", comment, interactive::render_verdict(&verdict).replace('\n', "\n  "));
                }
            }
        }
        Command::Interactive => {
            let classifier = load(&config).await?;
            interactive::run(&classifier, io::stdin().lock(), io::stdout())?;
        }
        Command::Download { fresh } => download(&config, fresh).await?,
        Command::Info => {
            let classifier = load(&config).await?;
            let info = classifier.info();
            println!("model:      {}", info.model_path);
            println!("tokenizer:  {}", info.tokenizer_path);
            println!("labels:     {}", info.num_labels);
            println!("mode:       {:?}", info.mode);
            println!("scoring:    {:?}", info.branch);
            println!("categories: {}", info.category_names.join(", "));
            println!("max tokens: {}", info.max_sequence_length);
        }
    }

    Ok(())
}
