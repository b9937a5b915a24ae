use std::io::Write;

use clap::{Parser, Subcommand};
use wheel_core::{spin_with_seeds, verify_outcome, Role, SpinSeeds, WheelConfig};
use wheel_server::{
    config::DEFAULT_DATABASE_URL,
    store::{SqliteStore, WheelStore},
};
use wheel_shared::{SpinLogEntry, SpinResult};

#[derive(Parser)]
#[command(name = "wheel-cli", about = "Admin CLI for the invite wheel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://wheel.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute a spin from its disclosed seeds
    Verify {
        #[arg(long)]
        server_seed: String,
        #[arg(long)]
        client_seed: String,
        #[arg(long)]
        nonce: u64,
        /// Claimed result (win or lose) to check against the seeds
        #[arg(long, requires = "segment")]
        result: Option<SpinResult>,
        /// Claimed landing segment
        #[arg(long, requires = "result")]
        segment: Option<u32>,
    },
    /// View last N spins
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: u32,
    },
    /// Export spins to CSV path
    ExportCsv { path: String },
    /// Set a user's role (user, elder, admin)
    SetRole { user_id: String, role: Role },
    /// Show a user's invitation grant
    Grants { user_id: String },
}

async fn open_store(url: Option<String>) -> anyhow::Result<SqliteStore> {
    let url = url.unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
    Ok(SqliteStore::open(&url).await?)
}

fn check_claim(seeds: &SpinSeeds, result: SpinResult, segment: u32) -> anyhow::Result<()> {
    if !verify_outcome(seeds, &WheelConfig::default(), result == SpinResult::Win, segment) {
        anyhow::bail!("claimed {result} on segment {segment} does not match these seeds");
    }
    Ok(())
}

fn write_csv<W: Write>(entries: &[SpinLogEntry], out: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            server_seed,
            client_seed,
            nonce,
            result,
            segment,
        } => {
            let seeds = SpinSeeds::new(server_seed, client_seed, nonce);
            println!("combined={}", seeds.combined());
            if let (Some(result), Some(segment)) = (result, segment) {
                check_claim(&seeds, result, segment)?;
                println!("claim matches");
            }
            let outcome = spin_with_seeds(seeds, &WheelConfig::default());
            println!(
                "hash={} hash_int={} roll={} result={} segment={}",
                outcome.hash,
                outcome.hash_int,
                outcome.roll,
                SpinResult::from_win(outcome.is_win),
                outcome.landing_segment
            );
        }
        Commands::ViewLogs { n } => {
            let store = open_store(cli.database_url).await?;
            for spin in store.recent_spins(n).await? {
                let e = spin.to_log_entry();
                println!(
                    "#{:>6} {} user={} result={} nonce={} hash={}",
                    e.id,
                    e.spun_at.to_rfc3339(),
                    e.user_id,
                    e.result,
                    e.nonce.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                    e.hash.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::ExportCsv { path } => {
            let store = open_store(cli.database_url).await?;
            let entries: Vec<SpinLogEntry> = store
                .all_spins()
                .await?
                .iter()
                .map(|s| s.to_log_entry())
                .collect();
            write_csv(&entries, std::fs::File::create(&path)?)?;
            println!("Exported {} rows to {}", entries.len(), path);
        }
        Commands::SetRole { user_id, role } => {
            let store = open_store(cli.database_url).await?;
            store.set_role(&user_id, role).await?;
            println!("{user_id} is now {role}");
        }
        Commands::Grants { user_id } => {
            let store = open_store(cli.database_url).await?;
            match store.invitation_grant(&user_id).await? {
                Some(g) => println!(
                    "{} invites_remaining={} expiration_days={} granted_at={}",
                    g.user_id,
                    g.invites_remaining,
                    g.expiration_days
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "never".into()),
                    g.granted_at.to_rfc3339()
                ),
                None => println!("{user_id} has no invitation grant"),
            }
        }
    }

    Ok(())
}
