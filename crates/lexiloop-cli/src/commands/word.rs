use clap::Subcommand;

use super::common::{open_engine, print_snapshot};

#[derive(Subcommand)]
pub enum WordAction {
    /// Advance to the next word
    Next,
    /// Step back in history
    Prev,
    /// Permanently skip the current word for this library, then advance
    Skip,
    /// Print the current word and session snapshot
    Current,
    /// Print upcoming words (for speech pre-caching)
    Upcoming {
        /// How many words to look ahead; defaults to session.lookahead
        #[arg(long)]
        count: Option<usize>,
    },
}

pub async fn run(action: WordAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, cfg) = open_engine().await?;
    match action {
        WordAction::Next => {
            engine.next();
            // A forward cursor move alone does not persist; this
            // process is about to exit, so write the cursor out.
            engine.persist()?;
            print_snapshot(&mut engine)?;
        }
        WordAction::Prev => {
            engine.prev();
            engine.persist()?;
            print_snapshot(&mut engine)?;
        }
        WordAction::Skip => {
            engine.skip_current();
            engine.next();
            print_snapshot(&mut engine)?;
        }
        WordAction::Current => {
            print_snapshot(&mut engine)?;
        }
        WordAction::Upcoming { count } => {
            let n = count.unwrap_or(cfg.session.lookahead);
            let words = engine.upcoming_words(n);
            println!("{}", serde_json::to_string_pretty(&words)?);
        }
    }
    Ok(())
}
