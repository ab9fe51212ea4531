use clap::Subcommand;

use super::common::{open_engine, print_snapshot};

#[derive(Subcommand)]
pub enum LibraryAction {
    /// List configured libraries
    List,
    /// Switch the active library
    Switch {
        /// Library id from the configuration
        id: String,
    },
    /// Print stage counts and progress for the active library
    Stats,
}

pub async fn run(action: LibraryAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, cfg) = open_engine().await?;
    match action {
        LibraryAction::List => {
            for meta in &cfg.libraries {
                let marker = if meta.id == engine.library() { "*" } else { " " };
                println!("{marker} {}\t{}\t{}", meta.id, meta.name, meta.source);
            }
        }
        LibraryAction::Switch { id } => {
            engine.change_library(&id).await?;
            print_snapshot(&mut engine)?;
        }
        LibraryAction::Stats => {
            let stats = serde_json::json!({
                "library": engine.library(),
                "totalWords": engine.total_words(),
                "stageCounts": engine.stage_counts(),
                "completed2dCount": engine.completed_two_day_count(),
                "pendingReviews": engine.schedule_store().len(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
