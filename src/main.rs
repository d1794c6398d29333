//! flomon_relay binary
//!
//! Reads webhook bodies from stdin, one JSON document per line, as forwarded
//! by the HTTP front end after it has acknowledged the request, and answers
//! each chat command through the LINE reply API.
//!
//! ```bash
//! # production: PostgreSQL + LINE
//! flomon_relay --config relay.toml
//!
//! # local replay of a fixture, printing reply payloads instead of sending;
//! # "now" is pinned to the newest row in the fixture unless --replay-at is given
//! BODY='{"events":[{"type":"message","replyToken":"t",
//!        "message":{"type":"text","text":"summary"}}]}'
//! echo $BODY | flomon_relay --replay fixtures/sample.json --dry-run
//! echo $BODY | flomon_relay --replay fixtures/sample.json \
//!     --replay-at 2024-05-01T15:00:00Z --dry-run
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::io::BufReader;

use flomon_relay::config::{DEFAULT_CONFIG_PATH, RelayConfig, Secrets};
use flomon_relay::delivery::{ConsoleSink, DeliverySink, LineSink};
use flomon_relay::dispatch::Dispatcher;
use flomon_relay::logging::{self, LogSource};
use flomon_relay::model::Result;
use flomon_relay::repository::{MemoryRepository, PgRepository, Repository};

#[derive(Debug, Parser)]
#[command(name = "flomon_relay", about = "Flood level chat relay")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "FLOMON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serve readings from a JSON fixture instead of the database.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Treat this RFC 3339 instant as "now" during replay. Defaults to the
    /// newest reading or report in the fixture.
    #[arg(long, requires = "replay")]
    replay_at: Option<DateTime<Utc>>,

    /// Print reply payloads to stdout instead of calling the LINE API.
    #[arg(long)]
    dry_run: bool,

    /// Include timestamps in log output.
    #[arg(long)]
    log_timestamps: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_logger("flomon_relay=info", args.log_timestamps);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(LogSource::System, None, &format!("fatal: {e}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = RelayConfig::load(&args.config)?;
    let secrets = Secrets::from_env();

    let (repository, clock): (Arc<dyn Repository>, Option<DateTime<Utc>>) = match &args.replay {
        Some(path) => {
            let fixture = MemoryRepository::load_fixture(path)?;
            let fixture = match args.replay_at {
                Some(now) => fixture.with_clock(now),
                None => fixture.pinned_to_newest(),
            };
            let clock = fixture.clock();
            (Arc::new(fixture), clock)
        }
        None => {
            let url = secrets.require_database_url()?;
            (Arc::new(PgRepository::connect(url).await?), None)
        }
    };
    let sink: Arc<dyn DeliverySink> = if args.dry_run {
        Arc::new(ConsoleSink)
    } else {
        Arc::new(LineSink::new(&config.line, secrets.require_line_token()?)?)
    };

    let mut dispatcher = Dispatcher::new(repository, sink, &config);
    if let Some(now) = clock {
        logging::info(LogSource::System, None, &format!("replaying with clock pinned to {now}"));
        dispatcher = dispatcher.with_clock(now);
    }
    logging::info(
        LogSource::System,
        None,
        &format!("relay ready, delivering via {}", dispatcher.sink_name()),
    );

    let summary = dispatcher.serve_lines(BufReader::new(tokio::io::stdin())).await;
    logging::info(
        LogSource::System,
        None,
        &format!(
            "input closed after {} batch(es), {} skipped line(s); shutting down",
            summary.batches, summary.skipped_lines
        ),
    );
    Ok(())
}
