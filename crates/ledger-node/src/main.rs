use anyhow::Context;
use clap::Parser;
use ledger_core::clock::system_clock;
use ledger_core::Ledger;
use ledger_node::backup::{restore_latest, BackupJob};
use ledger_node::{router, AppState, HttpTransport, NodeArgs};
use ledger_storage::sled_store::SledStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = NodeArgs::parse();
    args.validate()?;

    let transport = HttpTransport::new(args.peer_timeout())?;
    let ledger = Arc::new(Ledger::new(args.ledger_config(), transport, system_clock())?);
    let store = Arc::new(
        SledStore::open(&args.data_dir)
            .with_context(|| format!("open sled at {}", args.data_dir.display()))?,
    );

    if args.restore {
        match restore_latest(ledger.as_ref(), &store)? {
            Some(length) => info!(length, "restored chain from backup"),
            None => info!("no backup to restore"),
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let backups = BackupJob {
        ledger: ledger.clone(),
        store: store.clone(),
        dir: args.backup_dir.clone(),
        host: args.host.clone(),
        port: args.port,
        keep: args.backup_keep,
    }
    .spawn(args.backup_interval()?, shutdown_rx);

    let app = router(AppState {
        ledger,
        host: args.host.clone(),
        port: args.port,
    });

    let addr = args.bind_addr();
    info!(advertised = %args.self_address(), "ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    shutdown_tx.send(true).ok();
    backups.await?;
    store.close()?;
    Ok(())
}
