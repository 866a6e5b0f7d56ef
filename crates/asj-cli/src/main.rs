use anyhow::{Context, Result};
use asj_catalog::BidStage;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "asj")]
#[command(about = "Art show jockey CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },

    /// Bidder-ID sheet generation
    Bidders {
        #[command(subcommand)]
        cmd: BiddersCmd,
    },

    /// Space allocation
    Spaces {
        #[command(subcommand)]
        cmd: SpacesCmd,
    },

    /// Show-stage operations (close bidding, reset won, mark returned)
    Show {
        #[command(subcommand)]
        cmd: ShowCmd,
    },

    /// Artist ledger runs (fees, winnings, cheques)
    Ledger {
        #[command(subcommand)]
        cmd: LedgerCmd,
    },

    /// Bulk results distribution (talks to a running asj-server)
    Results {
        #[command(subcommand)]
        cmd: ResultsCmd,
    },

    /// Telegram bot administration
    Telegram {
        #[command(subcommand)]
        cmd: TelegramCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Compute layered config hash + print canonical JSON
    Hash {
        /// Paths in merge order (base -> show -> local overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Report config keys nothing in the code reads
    Check {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,

        /// Exit non-zero when unused keys are found
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum BiddersCmd {
    /// Print a run of bidder codes with check digits for sheet printing.
    Codes {
        /// First code body (the printed run counts up from here)
        #[arg(long)]
        start: u32,

        #[arg(long)]
        count: u32,

        /// Layered config paths (for the show's checksum offset and glyph)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Validate and store a code against a registered bidder.
    Assign {
        #[arg(long)]
        bidder_id: i32,

        #[arg(long)]
        code: String,

        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum SpacesCmd {
    /// Allocate outstanding space requests first-come-first-served.
    Allocate,
}

#[derive(Subcommand)]
enum ShowCmd {
    /// Evaluate every In Show piece at a bidding-stage close.
    Close {
        /// intermediate | close | final
        #[arg(long)]
        stage: String,
    },

    /// Reset Won pieces back to In Show (undo a premature close).
    ClearWon {
        /// Acknowledge that won status will be recomputed from scratch.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Mark every piece still In Show as Returned (end of show teardown).
    ApplyReturned,
}

#[derive(Subcommand)]
enum LedgerCmd {
    /// Recompute space-fee ledger entries for every artist.
    ApplyFees,

    /// Recompute winnings and commission entries for every artist.
    ApplyWinnings {
        /// Layered config paths (for the commission rate)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Draft cheques paying out every positive artist balance.
    Cheques {
        /// Layered config paths (for the cheque thank-you line)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum TelegramCmd {
    /// Register the configured webhook URL with the Bot API.
    ///
    /// Reads the bot token from ASJ_TELEGRAM_BOT_TOKEN and the webhook
    /// secret from ASJ_TELEGRAM_WEBHOOK_SECRET.
    SetWebhook {
        /// Layered config paths (for telegram.webhook_url)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ResultsCmd {
    /// Ask the server to start the bulk results distribution task.
    Send {
        /// Base URL of the running asj-server
        #[arg(long, default_value = "http://127.0.0.1:8880")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = asj_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = asj_db::status(&pool).await?;
                    println!("db_ok={} has_pieces_table={}", s.ok, s.has_pieces_table);
                }
                DbCmd::Migrate => {
                    asj_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::Config { cmd } => match cmd {
            ConfigCmd::Hash { paths } => {
                let loaded = load_config(&paths)?;
                println!("config_hash={}", loaded.config_hash);
                println!("{}", loaded.canonical_json);
            }
            ConfigCmd::Check { paths, strict } => {
                let loaded = load_config(&paths)?;
                // Surfaces typo'd sections before a show opens with them silently ignored.
                let policy = if strict {
                    asj_config::UnusedKeyPolicy::Fail
                } else {
                    asj_config::UnusedKeyPolicy::Warn
                };
                let report = asj_config::report_unused_keys(&loaded.config_json, policy)?;
                println!("config_hash={}", loaded.config_hash);
                println!("unused_keys={}", report.unused_leaf_pointers.len());
                for p in &report.unused_leaf_pointers {
                    println!("unused {p}");
                }
            }
        },

        Commands::Bidders { cmd } => match cmd {
            BiddersCmd::Codes {
                start,
                count,
                config_paths,
            } => {
                let show = load_config(&config_paths)?.show()?;
                let codes = asj_db::bidders::generate_codes(
                    start,
                    count,
                    show.bidder_id_offset,
                    show.bidder_id_check10,
                )?;
                for code in codes {
                    println!("{code}");
                }
            }
            BiddersCmd::Assign {
                bidder_id,
                code,
                config_paths,
            } => {
                let show = load_config(&config_paths)?.show()?;
                let pool = asj_db::connect_from_env().await?;
                asj_db::bidders::assign_bidder_code(
                    &pool,
                    bidder_id,
                    &code,
                    show.bidder_id_offset,
                    show.bidder_id_check10,
                )
                .await?;
                println!("assigned=true bidder_id={bidder_id} code={code}");
            }
        },

        Commands::Spaces { cmd } => match cmd {
            SpacesCmd::Allocate => {
                let pool = asj_db::connect_from_env().await?;
                let summary = asj_db::artists::run_space_allocation(&pool).await?;
                println!(
                    "allocation_granted={} allocation_rejected={}",
                    summary.granted, summary.rejected
                );
            }
        },

        Commands::Show { cmd } => {
            let pool = asj_db::connect_from_env().await?;
            match cmd {
                ShowCmd::Close { stage } => {
                    let stage = parse_stage(&stage)?;
                    let summary = asj_db::pieces::close_bidding(&pool, stage).await?;
                    println!(
                        "marked_won={} voice_auction={} unchanged={}",
                        summary.marked_won, summary.voice_auction, summary.unchanged
                    );
                }
                ShowCmd::ClearWon { yes } => {
                    if !yes {
                        anyhow::bail!(
                            "REFUSING CLEAR-WON: this resets every Won piece to In Show. Re-run with: `asj show clear-won --yes`"
                        );
                    }
                    let n = asj_db::pieces::clear_won_status(&pool).await?;
                    println!("cleared_won={n}");
                }
                ShowCmd::ApplyReturned => {
                    let n = asj_db::pieces::apply_returned(&pool).await?;
                    println!("marked_returned={n}");
                }
            }
        }

        Commands::Ledger { cmd } => {
            let pool = asj_db::connect_from_env().await?;
            let artist_ids: Vec<i32> = asj_db::artists::list_artists(&pool)
                .await?
                .iter()
                .map(|a| a.artist_id)
                .collect();
            match cmd {
                LedgerCmd::ApplyFees => {
                    let applied = asj_db::ledger::apply_space_fees(&pool, &artist_ids).await?;
                    println!("artists={} space_fees_applied={}", artist_ids.len(), applied);
                }
                LedgerCmd::ApplyWinnings { config_paths } => {
                    let show = load_config(&config_paths)?.show()?;
                    let applied = asj_db::ledger::apply_winnings_and_commission(
                        &pool,
                        &artist_ids,
                        show.commission,
                    )
                    .await?;
                    println!(
                        "artists={} commission_rate={} winnings_applied={}",
                        artist_ids.len(),
                        show.commission.percent_string(),
                        applied
                    );
                }
                LedgerCmd::Cheques { config_paths } => {
                    let show = load_config(&config_paths)?.show()?;
                    let drafts = asj_db::ledger::create_cheques(&pool, &artist_ids).await?;
                    println!("cheques_created={}", drafts.len());
                    if !show.cheque_thank_you.is_empty() {
                        // Printed on every cheque stub.
                        println!("memo={:?}", show.cheque_thank_you);
                    }
                    for (artist_id, draft) in &drafts {
                        println!(
                            "artist_id={} payee={:?} amount={} words={:?}",
                            artist_id,
                            draft.payee,
                            draft.face_value(),
                            draft.amount_words()
                        );
                    }
                }
            }
        }

        Commands::Results { cmd } => match cmd {
            ResultsCmd::Send { server } => {
                let url = format!("{}/v1/tasks/results", server.trim_end_matches('/'));
                let resp = reqwest::Client::new()
                    .post(&url)
                    .send()
                    .await
                    .with_context(|| format!("POST {url} failed"))?;
                let status = resp.status();
                let body: serde_json::Value =
                    resp.json().await.context("server reply was not JSON")?;
                if !status.is_success() {
                    anyhow::bail!("server refused results send ({status}): {body}");
                }
                let task_id = body
                    .get("task_id")
                    .and_then(|v| v.as_str())
                    .context("server reply missing task_id")?;
                println!("results_task_started=true task_id={task_id}");
                println!("watch progress at {}/v1/stream", server.trim_end_matches('/'));
            }
        },

        Commands::Telegram { cmd } => match cmd {
            TelegramCmd::SetWebhook { config_paths } => {
                let show = load_config(&config_paths)?.show()?;
                if !show.telegram.enabled {
                    anyhow::bail!("telegram is disabled in this config (telegram.enabled: false)");
                }
                if show.telegram.webhook_url.is_empty() {
                    anyhow::bail!("telegram.webhook_url is not set in this config");
                }
                let token = std::env::var("ASJ_TELEGRAM_BOT_TOKEN")
                    .context("ASJ_TELEGRAM_BOT_TOKEN is not set")?;
                let secret = std::env::var("ASJ_TELEGRAM_WEBHOOK_SECRET").unwrap_or_default();
                if secret.is_empty() {
                    anyhow::bail!(
                        "ASJ_TELEGRAM_WEBHOOK_SECRET is not set; the server refuses unsigned webhook deliveries"
                    );
                }
                asj_notify::TelegramClient::new(&token)
                    .set_webhook(&show.telegram.webhook_url, &secret)
                    .await?;
                println!("webhook_set=true url={}", show.telegram.webhook_url);
            }
        },
    }

    Ok(())
}

fn load_config(paths: &[String]) -> Result<asj_config::LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    asj_config::load_layered_yaml(&path_refs)
}

fn parse_stage(s: &str) -> Result<BidStage> {
    match s.to_ascii_lowercase().as_str() {
        "intermediate" => Ok(BidStage::Intermediate),
        "close" => Ok(BidStage::Close),
        "final" => Ok(BidStage::Final),
        other => anyhow::bail!("unknown stage {other:?} (expected intermediate, close or final)"),
    }
}
