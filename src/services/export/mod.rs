use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::models::TrainedModel;
use crate::services::recommendation;

/// Write the top-K ranked `(user_id, item_id, score)` tuples for every user
/// to a CSV sink, one row per user per rank. The target file is fully
/// replaced, matching the keyed-table-replacement semantics of the batch
/// job this feeds.
pub fn write_rankings(path: &Path, model: &TrainedModel, top_k: usize) -> Result<()> {
    let file = File::create(path)?;
    let rows = write_rankings_to(file, model, top_k)?;
    info!(rows, path = %path.display(), "exported recommendation rankings");
    Ok(())
}

pub fn write_rankings_to<W: Write>(writer: W, model: &TrainedModel, top_k: usize) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["user_id", "item_id", "score"])?;

    let mut rows = 0usize;
    for user_id in model.mapping.user_ids() {
        for ranked in recommendation::top_ranked(model, user_id, top_k) {
            wtr.write_record([
                user_id.as_str(),
                &ranked.item_id.to_string(),
                &ranked.score.to_string(),
            ])?;
            rows += 1;
        }
    }

    wtr.flush()?;
    Ok(rows)
}

/// Persist a trained serving pair as JSON so a separate serving process can
/// load it without retraining. The pair is written and read as one unit;
/// factors and mapping from different runs can never be recombined.
pub fn write_model_snapshot(path: &Path, model: &TrainedModel) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), model)
        .map_err(|e| crate::error::EngineError::Snapshot(e.to_string()))?;
    info!(path = %path.display(), "wrote model snapshot");
    Ok(())
}

pub fn read_model_snapshot(path: &Path) -> Result<TrainedModel> {
    let file = File::open(path)?;
    let model: TrainedModel = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| crate::error::EngineError::Snapshot(e.to_string()))?;
    model.check_consistent()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{InteractionRow, TrainerVariant};
    use crate::services::training::TrainingService;
    use std::sync::Arc;

    fn trained_model() -> TrainedModel {
        let mut config = Config::default();
        config.sgd.seed = Some(21);
        config.sgd.epochs = 5;
        config.sgd.factors = 4;
        let service = TrainingService::new(Arc::new(config));
        service
            .train(
                vec![
                    InteractionRow::new("alice", 101).with_views(5.0),
                    InteractionRow::new("alice", 102).with_buys(1.0),
                    InteractionRow::new("bob", 103).with_rating(5.0),
                ],
                TrainerVariant::Sgd,
            )
            .unwrap()
    }

    #[test]
    fn writes_one_row_per_user_per_rank() {
        let model = trained_model();
        let mut buffer = Vec::new();
        let rows = write_rankings_to(&mut buffer, &model, 1).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "user_id,item_id,score");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("alice,103,"));
        assert!(lines[2].starts_with("bob,"));
    }

    #[test]
    fn snapshot_round_trips_the_serving_pair() {
        let model = trained_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        write_model_snapshot(&path, &model).unwrap();
        let restored = read_model_snapshot(&path).unwrap();

        assert_eq!(restored.mapping.num_users(), model.mapping.num_users());
        assert_eq!(restored.factors.user_factors, model.factors.user_factors);
        assert_eq!(
            crate::services::recommendation::recommend(&restored, "alice", 5),
            crate::services::recommendation::recommend(&model, "alice", 5),
        );
    }

    #[test]
    fn replaces_the_target_file() {
        let model = trained_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rankings.csv");

        std::fs::write(&path, "stale contents").unwrap();
        write_rankings(&path, &model, 2).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("user_id,item_id,score"));
        assert!(!text.contains("stale"));
    }
}
