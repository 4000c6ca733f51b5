use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use ninelives_config::BackendKind;
use ninelives_types::TokenAmount;

#[derive(Parser, Debug)]
#[command(
    name = "ninelives",
    version,
    about = "Keep your cat alive: check in once a day, pay to restore lost lives",
    infer_subcommands = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Backend to use (default: app.backend from the config, else ledger).
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Acting address (default: app.actor from the config).
    #[arg(long, global = true, value_name = "ADDRESS")]
    pub actor: Option<String>,

    /// Ledger database or local snapshot path (default: from the config).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Authoritative SQLite ledger.
    Ledger,
    /// Local snapshot store with a mock wallet.
    Local,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Ledger => BackendKind::Ledger,
            BackendArg::Local => BackendKind::Local,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Adopt a cat (one per address).
    Create,

    /// Daily check-in; keeps the streak going.
    CheckIn,

    /// Take one life from a cat.
    LoseLife {
        /// Cat owner to target (default: the acting address).
        #[arg(long, value_name = "ADDRESS")]
        target: Option<String>,
    },

    /// Pay the restoration price to get one life back.
    RestoreLife,

    /// Show the cat and its check-in countdown.
    Status,

    /// Show payment asset balance and allowance.
    Balance,

    /// Credit test tokens to the acting address.
    Mint {
        /// Amount in whole tokens (e.g. 1, 2.5, 0.000001).
        amount: TokenAmount,
    },

    /// Authorize the game to spend up to this amount.
    Approve {
        /// Amount in whole tokens (e.g. 1, 2.5, 0.000001).
        amount: TokenAmount,
    },

    /// Print the event log for the acting address (ledger only).
    Events,
}
