mod checkpoint;
mod config;
mod interrupt;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    AuthoringSession, DraftStore, GenerationController, HttpApiOptions,
    HttpAuthoringApi, ReviewController, TracingNotifier, ViewCache,
};
use serde_json::Value;
use shared::domain::{AuthoringMode, ContentId, DraftInput, ReviewPayload};
use storage::Storage;
use tracing::{debug, info};

use crate::{
    config::{load_settings, prepare_database_url, validate_api_base_url, Settings},
    interrupt::interruptible,
};

#[derive(Parser, Debug)]
#[command(name = "authoring", about = "Draft, generate and review blog content")]
struct Args {
    /// Path of the flat TOML config file.
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[arg(long, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a prompt and keep the analysis in the draft.
    Analyze { prompt: String },
    /// Generate a post; reuses the draft's analysis when it was made for the same prompt.
    Generate {
        prompt: String,
        #[arg(long)]
        fresh: bool,
    },
    Review {
        #[arg(long)]
        id: Option<String>,
        /// Ad hoc JSON payload to review instead of a stored post.
        #[arg(long)]
        payload: Option<String>,
    },
    ApplyReview {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        payload: String,
    },
    RestoreVersion { id: String, version: u32 },
    Draft {
        #[command(subcommand)]
        action: DraftCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DraftCommand {
    Show,
    Status,
    Save {
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Write,
    AiGenerate,
}

impl From<ModeArg> for AuthoringMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Write => AuthoringMode::Write,
            ModeArg::AiGenerate => AuthoringMode::AiGenerate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    apply_flags(&mut settings, &args);

    let cache = Arc::new(ViewCache::new());
    let session = build_session(&settings, cache.clone()).await?;

    match args.command {
        Command::Analyze { prompt } => {
            let generation = session.generation();
            let analysis = interruptible(
                generation.analyze_prompt(&prompt),
                tokio::signal::ctrl_c(),
                || generation.cancel_request(),
            )
            .await?;
            let draft = current_draft(&session).await;
            session
                .checkpoint(checkpoint::with_analysis(draft, &prompt, analysis.clone()))
                .await;
            print_json(&analysis)?;
        }
        Command::Generate { prompt, fresh } => {
            let draft = current_draft(&session).await;
            let analysis = if fresh || draft.prompt != prompt {
                None
            } else {
                draft.prompt_analysis.clone()
            };
            let generation = session.generation();
            let generated = interruptible(
                generation.generate_blog(&prompt, analysis),
                tokio::signal::ctrl_c(),
                || generation.cancel_request(),
            )
            .await?;
            session
                .checkpoint(checkpoint::with_generated(draft, &prompt, &generated))
                .await;
            print_json(&generated)?;
        }
        Command::Review { id, payload } => {
            let payload = payload.as_deref().map(parse_payload).transpose()?;
            let review = session.review().review(id.map(ContentId::new), payload);
            let result = interruptible(review, tokio::signal::ctrl_c(), || {}).await?;
            print_json(&result)?;
        }
        Command::ApplyReview { id, payload } => {
            let payload = parse_payload(&payload)?;
            let apply = session.review().apply_review(id.map(ContentId::new), payload);
            let reference = interruptible(apply, tokio::signal::ctrl_c(), || {}).await?;
            print_json(&reference)?;
        }
        Command::RestoreVersion { id, version } => {
            let content_id = ContentId::new(id);
            let restore = session.review().restore_version(&content_id, version);
            let outcome = interruptible(restore, tokio::signal::ctrl_c(), || {}).await?;
            print_json(&outcome)?;
        }
        Command::Draft { action } => run_draft_command(&session, action).await?,
    }

    for key in cache.drain_stale() {
        debug!(?key, "api: cached view is stale");
    }
    Ok(())
}

fn apply_flags(settings: &mut Settings, args: &Args) {
    if let Some(v) = &args.api_url {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = &args.database_url {
        settings.database_url = v.clone();
    }
    if let Some(v) = &args.token {
        settings.api_token = Some(v.clone());
    }
}

async fn build_session(settings: &Settings, cache: Arc<ViewCache>) -> Result<AuthoringSession> {
    let base_url = validate_api_base_url(&settings.api_base_url)?;
    let draft_ttl = settings.draft_ttl().context("invalid draft settings")?;
    let request_timeout = settings
        .request_timeout()
        .context("invalid request settings")?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open draft storage at '{database_url}'"))?;
    info!(api = %base_url, database_url = %database_url, "authoring: starting");

    let api = Arc::new(HttpAuthoringApi::new(
        base_url.as_str(),
        HttpApiOptions {
            bearer_token: settings.api_token.clone(),
            timeout: Some(request_timeout),
        },
    )?);
    let notifier = Arc::new(TracingNotifier);
    let drafts = DraftStore::new(Arc::new(storage)).with_ttl(draft_ttl);

    Ok(AuthoringSession::new(
        Arc::new(drafts),
        Arc::new(GenerationController::new(api.clone(), notifier.clone())),
        Arc::new(ReviewController::new(api, notifier, cache)),
    ))
}

async fn run_draft_command(session: &AuthoringSession, action: DraftCommand) -> Result<()> {
    match action {
        DraftCommand::Show => match session.resume().await {
            Some(record) => print_json(&record)?,
            None => println!("no saved draft"),
        },
        DraftCommand::Status => {
            let valid = session.drafts().peek_validity().await;
            println!("{}", if valid { "valid" } else { "none" });
        }
        DraftCommand::Save {
            mode,
            prompt,
            title,
            content,
        } => {
            let mut draft = current_draft(session).await;
            if let Some(mode) = mode {
                draft.mode = mode.into();
            }
            if let Some(prompt) = prompt {
                draft.prompt = prompt;
            }
            if let Some(title) = title {
                draft.form_data.title = title;
            }
            if let Some(content) = content {
                draft.form_data.content = content;
            }
            session.checkpoint(draft).await;
        }
        DraftCommand::Clear => session.end().await,
    }
    Ok(())
}

async fn current_draft(session: &AuthoringSession) -> DraftInput {
    session
        .resume()
        .await
        .map(|record| record.into_input())
        .unwrap_or_default()
}

fn parse_payload(raw: &str) -> Result<ReviewPayload> {
    let value: Value = serde_json::from_str(raw).context("review payload must be valid JSON")?;
    Ok(ReviewPayload(value))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
