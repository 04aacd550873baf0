use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use distcopy::{
    Client, Config, DistcopyError, Distributor, Mode, Pattern, Request, RowSet, Server, Settings,
    SshCluster,
};

async fn run_pattern(pattern: Pattern, config: &Path) -> Result<(), DistcopyError> {
    let rows = RowSet::load(config)?;
    // Fail before opening any SSH session.
    rows.check(pattern)?;

    let cluster = SshCluster::connect(rows.nodes()).await?;
    let result = Distributor::new(&cluster, Settings::default())
        .run(pattern, &rows)
        .await;
    // Close sessions whether or not the run succeeded.
    cluster.close().await;

    let summary = result?;
    info!(
        ?pattern,
        rounds = summary.rounds,
        transfers = summary.transfers,
        "done"
    );
    Ok(())
}

async fn run_remote(mode: Mode) -> Result<(), DistcopyError> {
    let Mode::Remote {
        addr,
        command,
        token,
        folder,
        src,
        dst,
    } = mode
    else {
        return Ok(());
    };
    let request = Request {
        command: command.clone(),
        token: None,
        folder,
        src,
        dst,
    };
    let response = Client::new(addr, token).send(request).await?;
    println!("{}", serde_json::to_string(&response)?);
    response.into_result(&command, DistcopyError::Query)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), DistcopyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Config::parse();

    if let Some((pattern, config)) = cli.mode.pattern() {
        info!(?pattern, config = %config.display(), "starting");
        return run_pattern(pattern, config).await;
    }
    if let Some(server_config) = cli.mode.server_config() {
        let server = Server::bind(server_config).await?;
        return server.serve().await;
    }
    run_remote(cli.mode).await
}
