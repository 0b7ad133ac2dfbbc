use clap::Parser;
use log::{error, info};
use rcon_client::sim::{SimulatedSaves, SimulatedServer};
use rcon_client::{ClientOptions, RconClient};
use shared::{RconParameters, DEFAULT_MAX_PLAYERS, DEFAULT_RCON_PORT};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Profile name shown in the console logs
    #[arg(short = 'n', long, default_value = "Simulated Island")]
    profile: String,

    /// Maximum player slots reported in the roster summary
    #[arg(short = 'm', long, default_value_t = DEFAULT_MAX_PLAYERS)]
    max_players: u32,

    /// Players online when the simulation starts
    #[arg(short = 'p', long, default_value = "3")]
    players: usize,

    /// Chance per player poll that someone joins or leaves (0.0 - 1.0)
    #[arg(short = 'c', long, default_value = "0.3")]
    churn: f64,

    /// Chance that any single send fails (0.0 - 1.0)
    #[arg(short = 'f', long, default_value = "0.05")]
    fail_rate: f64,

    /// Server install directory; enables player details when set
    #[arg(short = 'i', long, default_value = "")]
    install_dir: String,

    /// Stop after this many seconds; runs until EOF or Ctrl-C when 0
    #[arg(short = 'd', long, default_value = "0")]
    duration: u64,
}

const PASSWORD: &str = "simulated";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info to see the console event streams");
    }

    let args = Args::parse();

    let server = SimulatedServer::new(PASSWORD)
        .with_churn(args.churn)
        .with_fail_rate(args.fail_rate);
    for name in ["Alice", "Bob", "Carol", "Dave", "Erin"]
        .iter()
        .cycle()
        .take(args.players)
    {
        server.add_player(name);
    }

    let params = RconParameters::new("127.0.0.1", DEFAULT_RCON_PORT, PASSWORD)
        .with_profile_name(args.profile.as_str())
        .with_max_players(args.max_players)
        .with_install_directory(args.install_dir.as_str());

    let client = RconClient::builder(params, Arc::new(server.clone()))
        .options(ClientOptions::default())
        .player_details(Arc::new(SimulatedSaves::new(server)))
        .start();

    let _printer = client.register_listener(|command| {
        for line in &command.lines {
            println!("[{}] {}", command.verb.as_str(), line);
        }
        Ok(())
    });

    info!("Type console commands, one per line");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let deadline = async {
        if args.duration > 0 {
            sleep(Duration::from_secs(args.duration)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(text) if text.trim().is_empty() => {}
                Some(text) => {
                    let pending = client.issue_command(text.trim());
                    tokio::spawn(async move {
                        if let Err(e) = pending.await {
                            error!("{}", e);
                        }
                    });
                }
                None => break,
            },
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let summary = client.players().summary;
    info!(
        "Shutting down with {}/{} players online ({} known)",
        summary.online, summary.max_players, summary.total
    );
    client.shutdown().await;

    Ok(())
}
