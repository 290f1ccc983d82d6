#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use psip_adapter::{load_school_seed, router, SharedRuntime};
use psip_core::LedgerRuntime;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("PSIP_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let mut ledger = LedgerRuntime::new();
    let mut seeded_schools = 0usize;
    if let Some(seed_path) = parse_seed_schools_path_from_env() {
        let rows = load_school_seed(&seed_path)?;
        seeded_schools = ledger
            .ingest_school_sites(rows)
            .map_err(|e| format!("school seed rejected: {e:?}"))?;
    }
    let runtime: SharedRuntime = Arc::new(Mutex::new(ledger));

    let app = router(runtime);
    println!("psip_adapter_http listening on http://{addr} (seeded_schools={seeded_schools})");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_seed_schools_path_from_env() -> Option<PathBuf> {
    env::var("PSIP_SEED_SCHOOLS_PATH")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
