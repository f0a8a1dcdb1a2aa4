use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};

use ticketdoc::records::{EarningRecord, OrderRecord, TicketRecord};
use ticketdoc::stats::{EarningsSummary, OrderStats, TicketStats};
use ticketdoc::{
    CachedQrSource, DirectorySink, OfflineQrSource, QrSource, RenderFormat, RendererConfig, TicketRenderRequest,
    TicketRenderer,
};

#[derive(Parser)]
#[command(name = "ticketdoc", version, about = "Render event tickets to PNG or PDF")]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one ticket and save it
    Render(RenderArgs),
    /// Print dashboard aggregates for exported records
    Stats(StatsArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum RecordKind {
    /// A TicketRenderRequest in camelCase
    Request,
    /// A ticket record as returned by the API
    Ticket,
    /// An order record as returned by the API
    Order,
}

#[derive(Args)]
struct RenderArgs {
    /// Read the ticket from a JSON file instead of flags
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "request")]
    kind: RecordKind,

    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    reference: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    venue: Option<String>,
    #[arg(long)]
    time: Option<String>,
    #[arg(long, default_value_t = 0.0)]
    price: f64,
    #[arg(long)]
    status: Option<String>,

    /// image (png) or document (pdf)
    #[arg(long, default_value = "image")]
    format: String,
    /// Verification URL prefix; the ticket id is appended
    #[arg(long)]
    verify_url: Option<String>,
    /// Output directory
    #[arg(long)]
    out: Option<PathBuf>,
    /// Skip the QR service and draw the fallback panel
    #[arg(long)]
    offline: bool,
    /// Print the paint commands instead of writing a file
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct StatsArgs {
    #[arg(long, conflicts_with_all = ["orders", "earnings"])]
    tickets: Option<PathBuf>,
    #[arg(long, conflicts_with = "earnings")]
    orders: Option<PathBuf>,
    #[arg(long)]
    earnings: Option<PathBuf>,
    /// Approved withdrawals, for --earnings
    #[arg(long, default_value_t = 0.0)]
    approved: f64,
    /// Pending withdrawals, for --earnings
    #[arg(long, default_value_t = 0.0)]
    pending: f64,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn build_request(args: &RenderArgs) -> anyhow::Result<TicketRenderRequest> {
    if let Some(path) = &args.input {
        return Ok(match args.kind {
            RecordKind::Request => read_json::<TicketRenderRequest>(path)?,
            RecordKind::Ticket => TicketRenderRequest::from(&read_json::<TicketRecord>(path)?),
            RecordKind::Order => TicketRenderRequest::from(&read_json::<OrderRecord>(path)?),
        });
    }
    let (Some(id), Some(title)) = (&args.id, &args.title) else {
        bail!("either --input or both --id and --title are required");
    };
    Ok(TicketRenderRequest {
        reference_code: args.reference.clone(),
        event_date: args.date.clone(),
        venue_label: args.venue.clone(),
        start_time: args.time.clone(),
        price: args.price,
        status: args.status.clone(),
        ..TicketRenderRequest::new(id.clone(), title.clone())
    })
}

async fn run_render<Q: QrSource>(
    renderer: TicketRenderer<Q, DirectorySink>,
    request: &TicketRenderRequest,
    format: RenderFormat,
    verify_url: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    if dry_run {
        let (surface, _) = renderer.plan(request, format, verify_url).await?;
        print!("{}", surface.dump());
        println!("digest {}", surface.digest());
        return Ok(());
    }

    let outcome = match renderer.render(request, format, verify_url).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_render_failure() => bail!("could not generate ticket: {}", e),
        Err(e) => return Err(e.into()),
    };
    let saved = renderer.sink().dir().join(&outcome.filename);
    println!("{} ({} bytes)", saved.display(), outcome.bytes.len());
    if let ticketdoc::QrStatus::Fallback { reason } = &outcome.qr {
        eprintln!("warning: QR code not embedded: {}", reason);
    }
    Ok(())
}

async fn render(mut config: RendererConfig, args: RenderArgs) -> anyhow::Result<()> {
    if let Some(out) = &args.out {
        config.output_dir = out.clone();
    }
    let request = build_request(&args)?;
    let format: RenderFormat = args.format.parse()?;
    let verify_url = args.verify_url.clone().unwrap_or_else(|| config.verification_base_url.clone());
    let sink = DirectorySink::new(config.output_dir.clone());

    if args.offline {
        let renderer = TicketRenderer::new(config, OfflineQrSource, sink)?;
        run_render(renderer, &request, format, &verify_url, args.dry_run).await
    } else {
        let qr = CachedQrSource::new(ticketdoc::HttpQrSource::new(&config)?, config.qr_cache_capacity);
        let renderer = TicketRenderer::new(config, qr, sink)?;
        run_render(renderer, &request, format, &verify_url, args.dry_run).await
    }
}

fn stats_json(args: &StatsArgs) -> anyhow::Result<String> {
    let json = if let Some(path) = &args.tickets {
        serde_json::to_string_pretty(&TicketStats::from_records(&read_json::<Vec<TicketRecord>>(path)?))?
    } else if let Some(path) = &args.orders {
        serde_json::to_string_pretty(&OrderStats::from_records(&read_json::<Vec<OrderRecord>>(path)?))?
    } else if let Some(path) = &args.earnings {
        let earnings = read_json::<Vec<EarningRecord>>(path)?;
        let today = chrono::Local::now().date_naive();
        serde_json::to_string_pretty(&EarningsSummary::compute(&earnings, args.approved, args.pending, today))?
    } else {
        bail!("one of --tickets, --orders or --earnings is required");
    };
    Ok(json)
}

fn stats(args: StatsArgs) -> anyhow::Result<()> {
    println!("{}", stats_json(&args)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RendererConfig::from_json_file(path),
        None => Ok(RendererConfig::default()),
    };

    let result = match config {
        Ok(config) => match cli.command {
            Command::Render(args) => render(config, args).await,
            Command::Stats(args) => stats(args),
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("ticketdoc: {:#}", e);
        std::process::exit(1);
    }
}
