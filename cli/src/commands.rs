//! Command dispatch.
//!
//! Rejections are expected outcomes and come back as [`Outcome::Rejected`] so
//! `main` can print one line and exit non-zero. Everything else that goes wrong
//! (unreadable database, bad treasury, missing actor) is an `anyhow` error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use ninelives_config::{BackendKind, NineLivesConfig, config_path};
use ninelives_core::{
    CatBackend, CatError, CatService, Signer, StaticSigner, SystemClock, TracingSink,
};
use ninelives_store::{LocalStore, SqliteLedger};
use ninelives_types::{ActorId, CatView};

use crate::cli::{Cli, Command};
use crate::render;

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Rejected(String),
}

/// Resolved invocation settings: flags first, then config, then defaults.
struct Settings {
    kind: BackendKind,
    path: PathBuf,
    treasury: ActorId,
    signer: StaticSigner,
}

impl Settings {
    fn resolve(cli: &Cli, config: &NineLivesConfig) -> Result<Self> {
        let kind = cli.backend.map_or_else(|| config.backend(), BackendKind::from);
        let path = cli.db.clone().unwrap_or_else(|| config.store_path(kind));
        let raw_treasury = config.treasury(kind);
        let treasury = ActorId::parse(&raw_treasury)
            .with_context(|| format!("invalid {} treasury in config", kind.as_str()))?;
        let signer = StaticSigner::new(
            cli.actor
                .clone()
                .or_else(|| config.actor().map(str::to_string)),
        );
        Ok(Self {
            kind,
            path,
            treasury,
            signer,
        })
    }
}

fn open_backend(kind: BackendKind, path: &Path, treasury: ActorId) -> Result<Box<dyn CatBackend>> {
    let backend: Box<dyn CatBackend> = match kind {
        BackendKind::Ledger => Box::new(
            SqliteLedger::open(path, treasury)
                .with_context(|| format!("failed to open ledger at {}", path.display()))?,
        ),
        BackendKind::Local => Box::new(
            LocalStore::open(path, treasury)
                .with_context(|| format!("failed to open local store at {}", path.display()))?,
        ),
    };
    Ok(backend)
}

/// A missing file means defaults; an unreadable or malformed one is an error,
/// never a silent fallback to the default backend and treasury.
fn load_config(path: Option<&Path>) -> Result<NineLivesConfig> {
    let Some(path) = path else {
        return Ok(NineLivesConfig::default());
    };
    let config = NineLivesConfig::load_from(path).context("failed to load config")?;
    Ok(config.unwrap_or_default())
}

pub fn run(cli: &Cli) -> Result<Outcome> {
    let config = load_config(config_path().as_deref())?;
    let settings = Settings::resolve(cli, &config)?;
    tracing::debug!(
        backend = settings.kind.as_str(),
        path = %settings.path.display(),
        "Resolved settings"
    );

    let service = || -> Result<CatService<Box<dyn CatBackend>>> {
        let backend = open_backend(settings.kind, &settings.path, settings.treasury.clone())?;
        Ok(CatService::new(backend, Arc::new(SystemClock)).with_sink(Arc::new(TracingSink)))
    };
    let actor = settings.signer.address()?;

    match &cli.command {
        Command::Create => mutation(service()?.create(&actor), "Adopted a cat"),
        Command::CheckIn => mutation(service()?.check_in(&actor), "Checked in"),
        Command::LoseLife { target } => {
            let target = match target {
                Some(raw) => ActorId::parse(raw)?,
                None => actor,
            };
            mutation(service()?.lose_life(&target), "Lost a life")
        }
        Command::RestoreLife => mutation(service()?.restore_life(&actor), "Restored a life"),
        Command::Status => {
            match service()?.status(&actor)? {
                Some(status) => println!("{}", render::status(&status)),
                None => println!("No cat for {actor}. Adopt one with `ninelives create`."),
            }
            Ok(Outcome::Done)
        }
        Command::Balance => {
            let service = service()?;
            let backend = service.backend();
            println!(
                "{}",
                render::wallet(backend.balance_of(&actor)?, backend.allowance_of(&actor)?)
            );
            Ok(Outcome::Done)
        }
        Command::Mint { amount } => {
            let balance = service()?.backend().mint(&actor, *amount)?;
            println!("Minted {amount}; balance {balance}");
            Ok(Outcome::Done)
        }
        Command::Approve { amount } => {
            service()?.backend().approve(&actor, *amount)?;
            println!("Approved {amount}");
            Ok(Outcome::Done)
        }
        Command::Events => print_events(&settings, &actor),
    }
}

fn mutation(result: Result<CatView, CatError>, verb: &str) -> Result<Outcome> {
    match result {
        Ok(cat) => {
            println!("{verb}: {}", render::cat_line(&cat));
            Ok(Outcome::Done)
        }
        Err(CatError::Rejected(err)) => Ok(Outcome::Rejected(err.to_string())),
        Err(CatError::Backend(err)) => Err(err).context("backend failure"),
    }
}

fn print_events(settings: &Settings, actor: &ActorId) -> Result<Outcome> {
    if settings.kind != BackendKind::Ledger {
        bail!("the event log is only kept by the ledger backend");
    }
    let ledger = SqliteLedger::open(&settings.path, settings.treasury.clone())
        .with_context(|| format!("failed to open ledger at {}", settings.path.display()))?;
    let events = ledger.events(actor)?;
    if events.is_empty() {
        println!("No events for {actor}");
    }
    for event in events {
        println!("{}", event.format());
    }
    Ok(Outcome::Done)
}
