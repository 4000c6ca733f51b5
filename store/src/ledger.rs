//! Authoritative ledger backend.
//!
//! A single SQLite database holds cat records, payment-asset accounts and an
//! append-only event log. Every mutation runs in one `IMMEDIATE` transaction:
//! the record read, the payment settlement, the record write and the log append
//! commit together or roll back together, the way a contract call either lands
//! in a block or reverts.
//!
//! The connection sits behind one mutex and writers take SQLite's write lock up
//! front, so commits and reads are serialized across all identities, not just
//! per identity. One writer per database file is what SQLite offers anyway.
//!
//! Unsigned 64-bit values (timestamps, token amounts) are stored as the `i64`
//! with the same bit pattern, so they round-trip losslessly through SQLite's
//! signed integers.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::{debug, info};

use ninelives_core::{BackendError, CatBackend, CatError, Plan, TokenLedger, Transition, settle};
use ninelives_types::{
    ActorId, CatEvent, CatRecord, CatView, EventArgs, Lives, Stage, Streak, TokenAmount,
};

use crate::private_fs::{create_private_file, restrict_sidecars};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Bit-preserving `u64` -> SQLite integer.
const fn to_sql_u64(value: u64) -> i64 {
    value as i64
}

/// Inverse of [`to_sql_u64`].
const fn from_sql_u64(value: i64) -> u64 {
    value as u64
}

fn sql_err(context: &'static str) -> impl FnOnce(rusqlite::Error) -> BackendError {
    move |err| BackendError::storage(context, err)
}

pub struct SqliteLedger {
    conn: Mutex<Connection>,
    treasury: ActorId,
}

impl SqliteLedger {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS ledger_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cats (
            owner TEXT PRIMARY KEY,
            lives INTEGER NOT NULL CHECK (lives BETWEEN 0 AND 9),
            streak INTEGER NOT NULL CHECK (streak >= 0),
            stage INTEGER NOT NULL CHECK (stage BETWEEN 0 AND 3),
            last_check_in INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS token_accounts (
            address TEXT PRIMARY KEY,
            balance INTEGER NOT NULL DEFAULT 0,
            allowance INTEGER NOT NULL DEFAULT 0,
            frozen INTEGER NOT NULL DEFAULT 0
        );

        -- Append-only, written in the same transaction as the change it describes
        CREATE TABLE IF NOT EXISTS cat_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            name TEXT NOT NULL,
            args TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cat_events_owner
        ON cat_events(owner, seq);
    ";

    /// Open or create the ledger at `path`, bound to `treasury`.
    ///
    /// A ledger remembers the treasury it was created with; reopening it with a
    /// different one is refused rather than silently redirecting payments.
    pub fn open(path: impl AsRef<Path>, treasury: ActorId) -> Result<Self, BackendError> {
        let path = path.as_ref();
        create_private_file(path)
            .map_err(|e| BackendError::storage(format!("prepare ledger at {}", path.display()), e))?;

        let conn = Connection::open(path)
            .map_err(|e| BackendError::storage(format!("open ledger at {}", path.display()), e))?;
        let ledger = Self::initialize(conn, treasury)?;
        restrict_sidecars(path)
            .map_err(|e| BackendError::storage("restrict ledger WAL files", e))?;
        info!(path = %path.display(), treasury = %ledger.treasury, "Ledger opened");
        Ok(ledger)
    }

    /// Open an in-memory ledger (for testing).
    pub fn open_in_memory(treasury: ActorId) -> Result<Self, BackendError> {
        let conn = Connection::open_in_memory().map_err(sql_err("open in-memory ledger"))?;
        Self::initialize(conn, treasury)
    }

    fn initialize(conn: Connection, treasury: ActorId) -> Result<Self, BackendError> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(sql_err("set ledger busy timeout"))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;",
        )
        .map_err(sql_err("set ledger pragmas"))?;
        conn.execute_batch(Self::SCHEMA)
            .map_err(sql_err("create ledger schema"))?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM ledger_meta WHERE key = 'treasury'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err("read ledger treasury"))?;
        match stored {
            Some(stored) if stored != treasury.as_str() => {
                return Err(BackendError::corrupt(
                    "ledger_meta.treasury",
                    format!("ledger was created for treasury {stored}, not {treasury}"),
                ));
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO ledger_meta (key, value) VALUES ('treasury', ?1)",
                    params![treasury.as_str()],
                )
                .map_err(sql_err("record ledger treasury"))?;
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            treasury,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, BackendError> {
        self.conn
            .lock()
            .map_err(|_| BackendError::Poisoned("ledger connection"))
    }

    /// Event log for `owner`, oldest first.
    pub fn events(&self, owner: &ActorId) -> Result<Vec<CatEvent>, BackendError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT seq, name, args FROM cat_events WHERE owner = ?1 ORDER BY seq ASC")
            .map_err(sql_err("prepare event query"))?;
        let rows = stmt
            .query_map(params![owner.as_str()], |row| {
                let seq: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                let args: String = row.get(2)?;
                Ok((seq, name, args))
            })
            .map_err(sql_err("query events"))?;

        let mut events = Vec::new();
        for row in rows {
            let (seq, name, args) = row.map_err(sql_err("read event row"))?;
            events.push(decode_event(owner, seq, &name, &args)?);
        }
        Ok(events)
    }

    /// Run `f` against the token accounts inside one write transaction.
    fn with_accounts<T>(
        &self,
        context: &'static str,
        f: impl FnOnce(&mut TxAccounts<'_, '_>) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sql_err("begin ledger transaction"))?;
        let value = f(&mut TxAccounts { tx: &tx })?;
        tx.commit().map_err(sql_err(context))?;
        Ok(value)
    }
}

impl CatBackend for SqliteLedger {
    fn name(&self) -> &'static str {
        "ledger"
    }

    fn treasury(&self) -> &ActorId {
        &self.treasury
    }

    fn load(&self, actor: &ActorId) -> Result<Option<CatRecord>, BackendError> {
        let conn = self.lock()?;
        read_cat(&conn, actor)
    }

    fn commit(&self, actor: &ActorId, plan: &mut Plan<'_>) -> Result<Transition, CatError> {
        let mut conn = self.lock()?;
        // Dropping `tx` on any early return rolls everything back.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sql_err("begin ledger transaction"))?;

        let current = read_cat(&tx, actor)?;
        let transition = plan(current.as_ref())?;
        if let Some(price) = transition.charge {
            settle(&mut TxAccounts { tx: &tx }, actor, &self.treasury, price)?;
        }
        write_cat(&tx, actor, &transition.record)?;
        append_event(&tx, &transition.event)?;
        tx.commit().map_err(sql_err("commit ledger transaction"))?;

        debug!(actor = %actor, event = transition.event.name(), "Ledger committed");
        Ok(transition)
    }

    fn balance_of(&self, actor: &ActorId) -> Result<TokenAmount, BackendError> {
        let conn = self.lock()?;
        Ok(read_account(&conn, actor)?.balance)
    }

    fn allowance_of(&self, owner: &ActorId) -> Result<TokenAmount, BackendError> {
        let conn = self.lock()?;
        Ok(read_account(&conn, owner)?.allowance)
    }

    fn mint(&self, actor: &ActorId, amount: TokenAmount) -> Result<TokenAmount, BackendError> {
        self.with_accounts("commit mint", |accounts| {
            let balance = accounts
                .balance(actor)?
                .checked_add(amount)
                .ok_or_else(|| BackendError::BalanceOverflow {
                    actor: actor.clone(),
                })?;
            accounts.set_balance(actor, balance)?;
            Ok(balance)
        })
    }

    fn approve(&self, owner: &ActorId, amount: TokenAmount) -> Result<(), BackendError> {
        self.with_accounts("commit approval", |accounts| {
            accounts.set_allowance(owner, amount)
        })
    }

    fn set_frozen(&self, actor: &ActorId, frozen: bool) -> Result<(), BackendError> {
        self.with_accounts("commit freeze", |accounts| {
            accounts
                .tx
                .execute(
                    "INSERT INTO token_accounts (address, frozen) VALUES (?1, ?2)
                     ON CONFLICT(address) DO UPDATE SET frozen = excluded.frozen",
                    params![actor.as_str(), frozen],
                )
                .map_err(sql_err("write frozen flag"))?;
            Ok(())
        })
    }
}

fn read_cat(conn: &Connection, actor: &ActorId) -> Result<Option<CatRecord>, BackendError> {
    let row = conn
        .query_row(
            "SELECT lives, streak, stage, last_check_in FROM cats WHERE owner = ?1",
            params![actor.as_str()],
            |row| {
                let lives: i64 = row.get(0)?;
                let streak: i64 = row.get(1)?;
                let stage: i64 = row.get(2)?;
                let last_check_in: i64 = row.get(3)?;
                Ok((lives, streak, stage, last_check_in))
            },
        )
        .optional()
        .map_err(sql_err("read cat"))?;

    let Some((lives, streak, stage, last_check_in)) = row else {
        return Ok(None);
    };
    let corrupt = |reason: &str| BackendError::corrupt(format!("cats[{actor}]"), reason);
    let view = CatView {
        lives: u8::try_from(lives).map_err(|_| corrupt("lives out of range"))?,
        streak: u32::try_from(streak).map_err(|_| corrupt("streak out of range"))?,
        stage: u8::try_from(stage).map_err(|_| corrupt("stage out of range"))?,
        last_check_in: from_sql_u64(last_check_in),
        exists: true,
    };
    CatRecord::try_from(view)
        .map(Some)
        .map_err(|err| corrupt(&err.to_string()))
}

fn write_cat(conn: &Connection, actor: &ActorId, record: &CatRecord) -> Result<(), BackendError> {
    conn.execute(
        "INSERT INTO cats (owner, lives, streak, stage, last_check_in)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(owner) DO UPDATE SET
             lives = excluded.lives,
             streak = excluded.streak,
             stage = excluded.stage,
             last_check_in = excluded.last_check_in",
        params![
            actor.as_str(),
            record.lives().get(),
            record.streak().get(),
            record.stage().as_u8(),
            to_sql_u64(record.last_check_in().as_secs()),
        ],
    )
    .map_err(sql_err("write cat"))?;
    Ok(())
}

fn append_event(conn: &Connection, event: &CatEvent) -> Result<(), BackendError> {
    let args = serde_json::to_string(&event.args())
        .map_err(|e| BackendError::storage("encode event args", e))?;
    conn.execute(
        "INSERT INTO cat_events (owner, name, args) VALUES (?1, ?2, ?3)",
        params![event.owner().as_str(), event.name(), args],
    )
    .map_err(sql_err("append event"))?;
    Ok(())
}

fn decode_event(owner: &ActorId, seq: i64, name: &str, args: &str) -> Result<CatEvent, BackendError> {
    let key = format!("cat_events[{seq}]");
    let args: EventArgs =
        serde_json::from_str(args).map_err(|e| BackendError::corrupt(key.clone(), e))?;
    let missing = |field: &str| BackendError::corrupt(key.clone(), format!("missing {field}"));
    let lives = || -> Result<Lives, BackendError> {
        let raw = args.lives.ok_or_else(|| missing("lives"))?;
        Lives::new(raw).map_err(|e| BackendError::corrupt(key.clone(), e))
    };

    let owner = owner.clone();
    match name {
        "CatCreated" => Ok(CatEvent::CatCreated { owner }),
        "CheckedIn" => {
            let streak = Streak::new(args.streak.ok_or_else(|| missing("streak"))?);
            let stage = args
                .stage
                .and_then(Stage::from_u8)
                .ok_or_else(|| missing("stage"))?;
            Ok(CatEvent::CheckedIn {
                owner,
                streak,
                stage,
            })
        }
        "LifeLost" => Ok(CatEvent::LifeLost {
            owner,
            lives: lives()?,
        }),
        "LifeRestored" => Ok(CatEvent::LifeRestored {
            owner,
            lives: lives()?,
        }),
        other => Err(BackendError::corrupt(key, format!("unknown event {other}"))),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Account {
    balance: TokenAmount,
    allowance: TokenAmount,
    frozen: bool,
}

fn read_account(conn: &Connection, address: &ActorId) -> Result<Account, BackendError> {
    let account = conn
        .query_row(
            "SELECT balance, allowance, frozen FROM token_accounts WHERE address = ?1",
            params![address.as_str()],
            |row| {
                let balance: i64 = row.get(0)?;
                let allowance: i64 = row.get(1)?;
                let frozen: bool = row.get(2)?;
                Ok(Account {
                    balance: TokenAmount::from_base_units(from_sql_u64(balance)),
                    allowance: TokenAmount::from_base_units(from_sql_u64(allowance)),
                    frozen,
                })
            },
        )
        .optional()
        .map_err(sql_err("read token account"))?;
    Ok(account.unwrap_or_default())
}

/// Token accounts viewed through an open transaction.
struct TxAccounts<'t, 'c> {
    tx: &'t Transaction<'c>,
}

impl TokenLedger for TxAccounts<'_, '_> {
    fn balance(&mut self, who: &ActorId) -> Result<TokenAmount, BackendError> {
        Ok(read_account(self.tx, who)?.balance)
    }

    fn allowance(&mut self, owner: &ActorId) -> Result<TokenAmount, BackendError> {
        Ok(read_account(self.tx, owner)?.allowance)
    }

    fn is_frozen(&mut self, who: &ActorId) -> Result<bool, BackendError> {
        Ok(read_account(self.tx, who)?.frozen)
    }

    fn set_balance(&mut self, who: &ActorId, amount: TokenAmount) -> Result<(), BackendError> {
        self.tx
            .execute(
                "INSERT INTO token_accounts (address, balance) VALUES (?1, ?2)
                 ON CONFLICT(address) DO UPDATE SET balance = excluded.balance",
                params![who.as_str(), to_sql_u64(amount.base_units())],
            )
            .map_err(sql_err("write balance"))?;
        Ok(())
    }

    fn set_allowance(&mut self, owner: &ActorId, amount: TokenAmount) -> Result<(), BackendError> {
        self.tx
            .execute(
                "INSERT INTO token_accounts (address, allowance) VALUES (?1, ?2)
                 ON CONFLICT(address) DO UPDATE SET allowance = excluded.allowance",
                params![owner.as_str(), to_sql_u64(amount.base_units())],
            )
            .map_err(sql_err("write allowance"))?;
        Ok(())
    }
}
