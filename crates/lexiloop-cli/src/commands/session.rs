use clap::Subcommand;

use super::common::{open_engine, print_snapshot};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Print the current session state as JSON
    Status,
    /// Advance the visible-session clock (only call for visible time)
    Tick {
        /// Seconds of visible time to credit
        #[arg(long, default_value = "1")]
        seconds: u64,
    },
    /// Restart the current library's session; long-term schedule is kept
    Reset,
}

pub async fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, _cfg) = open_engine().await?;
    match action {
        SessionAction::Status => {
            print_snapshot(&mut engine)?;
        }
        SessionAction::Tick { seconds } => {
            for _ in 0..seconds {
                engine.tick();
            }
            print_snapshot(&mut engine)?;
        }
        SessionAction::Reset => {
            engine.reinitialize().await?;
            print_snapshot(&mut engine)?;
        }
    }
    Ok(())
}
