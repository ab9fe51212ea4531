use lexiloop_core::{Config, Database, SessionEngine, SourceCatalogLoader};

pub type Engine = SessionEngine<Database, SourceCatalogLoader>;

/// Open storage, build the engine from config, and restore (or start)
/// the session for the selected library.
pub async fn open_engine() -> Result<(Engine, Config), Box<dyn std::error::Error>> {
    let cfg = Config::load_or_default();
    let db = Database::open()?;
    let loader = SourceCatalogLoader::new(cfg.libraries.clone());
    let library = cfg
        .startup_library()
        .unwrap_or_else(|| "default".to_string());
    let mut engine = SessionEngine::new(db, loader, library)
        .with_durations(cfg.session.block_size_sec, cfg.session.total_session_sec);
    engine.initialize().await?;
    Ok((engine, cfg))
}

pub fn print_snapshot(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = engine.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
