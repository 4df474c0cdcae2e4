use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use latentrec::dataset::feed;
use latentrec::services::{export, recommendation, training::TrainingService};
use latentrec::{init_tracing, Config, EngineContext, TrainerVariant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch trainer for the latentrec recommendation engine", long_about = None)]
struct Args {
    /// Interaction feed CSV: user_id,item_id,view_count,buy_count,rating
    #[arg(short, long)]
    input: PathBuf,

    /// Factorization variant to train
    #[arg(short, long, default_value = "als")]
    variant: TrainerVariant,

    /// Optional config file; defaults apply when absent
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Write top-K rankings per user to this CSV (full replace)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Persist the trained model/mapping pair as JSON
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Recommendations per user for the export and the demo output;
    /// defaults to the configured `recommend.top_n`
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("config file not found, using defaults");
        Config::default()
    };

    let top_k = args.top_k.unwrap_or(config.recommend.top_n);

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.training.threads)
        .build_global()
        .ok();

    let rows = feed::read_csv(&args.input)
        .with_context(|| format!("reading feed {}", args.input.display()))?;
    info!(rows = rows.len(), variant = ?args.variant, "loaded interaction feed");

    let service = TrainingService::new(Arc::new(config));
    let model = service.train(rows, args.variant)?;

    if let Some(output) = &args.output {
        export::write_rankings(output, &model, top_k)?;
    }
    if let Some(snapshot) = &args.snapshot {
        export::write_model_snapshot(snapshot, &model)?;
    }

    // Demo output mirroring what the serving layer would return.
    let context = EngineContext::with_model(model);
    let model = context.current().expect("model was just installed");
    if let Some(user_id) = model.mapping.user_ids().first() {
        let recs = recommendation::recommend(&model, user_id, top_k);
        info!(user = %user_id, ?recs, "sample recommendations");
    }
    if let Some(item_id) = model.mapping.item_ids().first() {
        let sims = recommendation::similar(&model, *item_id, top_k);
        info!(item = item_id, ?sims, "sample similar items");
    }

    Ok(())
}
