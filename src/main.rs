use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use claims_adjudicator::config::AppConfig;
use claims_adjudicator::error::AppError;
use claims_adjudicator::telemetry;
use claims_adjudicator::workflows::adjudication::{
    adjudication_router, AdjudicationService, AdjudicationSettings, ErrorBreakdown,
    InMemoryClaimStore, InMemoryRuleStore, RuleCategory, RuleSubmission, ValidationRunSummary,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Claims Adjudicator",
    about = "Validate insurance claims against technical and medical rule catalogs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one offline adjudication pass over local claim and rule files
    Adjudicate(AdjudicateArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct AdjudicateArgs {
    /// Claims CSV export to adjudicate
    #[arg(long)]
    claims: PathBuf,
    /// Technical rule documents (.json is treated as pre-structured,
    /// anything else as raw text for the extractor)
    #[arg(long = "technical-rules")]
    technical_rules: Vec<PathBuf>,
    /// Medical rule documents
    #[arg(long = "medical-rules")]
    medical_rules: Vec<PathBuf>,
    /// Print the per-claim classification lines
    #[arg(long)]
    list_claims: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Adjudicate(args) => run_adjudicate(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let service = Arc::new(AdjudicationService::new(
        Arc::new(InMemoryClaimStore::default()),
        Arc::new(InMemoryRuleStore::default()),
        config.adjudication,
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(adjudication_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "claims adjudicator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_adjudicate(args: AdjudicateArgs) -> Result<(), AppError> {
    let AdjudicateArgs {
        claims,
        technical_rules,
        medical_rules,
        list_claims,
    } = args;

    let service = AdjudicationService::new(
        Arc::new(InMemoryClaimStore::default()),
        Arc::new(InMemoryRuleStore::default()),
        AdjudicationSettings::default(),
    );

    for path in &technical_rules {
        upload_rule_file(&service, path, RuleCategory::Technical)?;
    }
    for path in &medical_rules {
        upload_rule_file(&service, path, RuleCategory::Medical)?;
    }

    let file = fs::File::open(&claims)?;
    let ids = service.ingest_claims(file)?;
    let summary = service.run_validation()?;
    let breakdown = service.error_breakdown()?;

    render_run_report(ids.len(), &summary, &breakdown);

    if list_claims {
        println!("\nClaim classifications");
        for claim in service.claim_results()? {
            println!(
                "- {} | {} | {} | {}",
                claim.claim_id.0,
                claim.status.label(),
                claim.error_category.label(),
                claim
                    .error_explanation
                    .as_deref()
                    .unwrap_or("pending")
                    .replace('\n', "; ")
            );
        }
    }

    Ok(())
}

fn upload_rule_file<C, R>(
    service: &AdjudicationService<C, R>,
    path: &Path,
    category: RuleCategory,
) -> Result<(), AppError>
where
    C: claims_adjudicator::workflows::adjudication::ClaimRepository + 'static,
    R: claims_adjudicator::workflows::adjudication::RuleDocumentRepository + 'static,
{
    let contents = fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let submission = if path.extension().is_some_and(|ext| ext == "json") {
        match serde_json::from_str(&contents) {
            Ok(payload) => RuleSubmission::Structured(payload),
            Err(_) => RuleSubmission::Unsupported,
        }
    } else {
        RuleSubmission::Text(contents)
    };

    let view = service.upload_rules(&name, category, submission)?;
    println!(
        "Loaded {} rules from {} ({} entries)",
        view.category,
        view.name,
        view.entries.len()
    );
    Ok(())
}

fn render_run_report(imported: usize, summary: &ValidationRunSummary, breakdown: &ErrorBreakdown) {
    println!("\nAdjudication run");
    println!("Claims imported: {imported}");
    println!(
        "Evaluated {}: {} validated, {} not validated",
        summary.evaluated, summary.validated, summary.not_validated
    );
    println!(
        "Errors: {} technical, {} medical, {} both",
        summary.technical_errors, summary.medical_errors, summary.both_errors
    );

    println!("\nBreakdown by error category");
    for (index, category) in breakdown.error_categories.iter().enumerate() {
        println!(
            "- {}: {} claim(s), {:.2} AED",
            category, breakdown.claim_counts[index], breakdown.paid_amounts[index]
        );
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
