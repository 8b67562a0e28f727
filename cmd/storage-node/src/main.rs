use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to set up LogTracer: {}", e);
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let cli = storage_node::Cli::parse();

    if let Err(e) = match cli.command {
        storage_node::Commands::Serve(args) => storage_node::node::serve(args.into()).await,
        storage_node::Commands::Format { disks } => {
            tracing::info!("Running format on {} disks", disks.len());
            storage_node::node::format(&disks).await
        }
        storage_node::Commands::Probe(args) => {
            storage_node::node::probe(&args.disks, &args.local_hosts, &args.peer_access()).await
        }
    } {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
