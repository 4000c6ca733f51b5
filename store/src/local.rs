//! Local ephemeral backend.
//!
//! Cat records live in memory behind one lock per identity. The payment asset is a
//! [`MockWallet`] behind its own lock, taken by a commit only when it charges, so
//! in memory the free mutations of different actors never contend. With a path,
//! every successful mutation is mirrored to one JSON snapshot shaped like browser
//! local storage, and writing that shared file serializes all commits:
//!
//! ```json
//! {
//!   "version": 1,
//!   "cats": { "cat_0xabc...": { "lives": 9, "streak": 0, "stage": 0, "lastCheckIn": 1700000000, "exists": true } },
//!   "wallet": { "balances": { "0xabc...": 5000000 }, "allowances": {}, "frozen": [] }
//! }
//! ```
//!
//! Lock order is always slot, then wallet, then mirror.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ninelives_core::{BackendError, CatBackend, CatError, Plan, TokenLedger, Transition, settle};
use ninelives_types::{ActorId, CatRecord, CatView, TokenAmount};

use crate::atomic_write::{atomic_write, recover_bak_file};
use crate::private_fs::{claim_file, create_parent_dir};

const SNAPSHOT_VERSION: u32 = 1;
const CAT_KEY_PREFIX: &str = "cat_";

type Slot = Arc<Mutex<Option<CatRecord>>>;

fn cat_key(actor: &ActorId) -> String {
    format!("{CAT_KEY_PREFIX}{actor}")
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, BackendError> {
    mutex.lock().map_err(|_| BackendError::Poisoned(what))
}

/// In-memory stand-in for the payment asset.
///
/// Missing entries read as zero balance, zero allowance and not frozen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockWallet {
    #[serde(default)]
    balances: BTreeMap<ActorId, TokenAmount>,
    #[serde(default)]
    allowances: BTreeMap<ActorId, TokenAmount>,
    #[serde(default)]
    frozen: BTreeSet<ActorId>,
}

impl MockWallet {
    fn credit(&mut self, who: &ActorId, amount: TokenAmount) -> Result<TokenAmount, BackendError> {
        let balance = self.balance(who)?.checked_add(amount).ok_or_else(|| {
            BackendError::BalanceOverflow {
                actor: who.clone(),
            }
        })?;
        self.set_balance(who, balance)?;
        Ok(balance)
    }
}

impl TokenLedger for MockWallet {
    fn balance(&mut self, who: &ActorId) -> Result<TokenAmount, BackendError> {
        Ok(self.balances.get(who).copied().unwrap_or_default())
    }

    fn allowance(&mut self, owner: &ActorId) -> Result<TokenAmount, BackendError> {
        Ok(self.allowances.get(owner).copied().unwrap_or_default())
    }

    fn is_frozen(&mut self, who: &ActorId) -> Result<bool, BackendError> {
        Ok(self.frozen.contains(who))
    }

    fn set_balance(&mut self, who: &ActorId, amount: TokenAmount) -> Result<(), BackendError> {
        self.balances.insert(who.clone(), amount);
        Ok(())
    }

    fn set_allowance(&mut self, owner: &ActorId, amount: TokenAmount) -> Result<(), BackendError> {
        self.allowances.insert(owner.clone(), amount);
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    cats: &'a BTreeMap<String, CatView>,
    wallet: &'a MockWallet,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(default)]
    cats: BTreeMap<String, CatView>,
    #[serde(default)]
    wallet: MockWallet,
}

pub struct LocalStore {
    treasury: ActorId,
    path: Option<PathBuf>,
    slots: Mutex<HashMap<ActorId, Slot>>,
    wallet: Mutex<MockWallet>,
    /// Persisted view of every cat, keyed like the snapshot. Empty without a path.
    mirror: Mutex<BTreeMap<String, CatView>>,
}

impl LocalStore {
    /// A store that never touches disk.
    #[must_use]
    pub fn in_memory(treasury: ActorId) -> Self {
        Self {
            treasury,
            path: None,
            slots: Mutex::new(HashMap::new()),
            wallet: Mutex::new(MockWallet::default()),
            mirror: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load (or start) a snapshot-backed store at `path`.
    ///
    /// Every cat entry is validated on the way in: the key must be `cat_` plus a
    /// parseable address, the stored stage must agree with the streak, and two
    /// keys that canonicalize to the same actor are rejected.
    pub fn open(path: impl Into<PathBuf>, treasury: ActorId) -> Result<Self, BackendError> {
        let path = path.into();
        create_parent_dir(&path)
            .map_err(|e| BackendError::storage("prepare snapshot directory", e))?;
        recover_bak_file(&path);
        claim_file(&path)
            .map_err(|e| BackendError::storage(format!("claim snapshot {}", path.display()), e))?;

        let snapshot = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<Snapshot>(&text)
                .map_err(|e| BackendError::corrupt(path.display().to_string(), e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Snapshot {
                version: SNAPSHOT_VERSION,
                cats: BTreeMap::new(),
                wallet: MockWallet::default(),
            },
            Err(e) => {
                return Err(BackendError::storage(
                    format!("read snapshot {}", path.display()),
                    e,
                ));
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BackendError::corrupt(
                path.display().to_string(),
                format!("unsupported snapshot version {}", snapshot.version),
            ));
        }

        let mut slots = HashMap::new();
        let mut mirror = BTreeMap::new();
        for (key, view) in snapshot.cats {
            let (actor, record) = decode_entry(&key, view)?;
            if mirror.insert(cat_key(&actor), record.view()).is_some() {
                return Err(BackendError::corrupt(key, "duplicate entry for the same actor"));
            }
            slots.insert(actor, Arc::new(Mutex::new(Some(record))));
        }

        info!(
            path = %path.display(),
            cats = slots.len(),
            "Local store loaded"
        );
        Ok(Self {
            treasury,
            path: Some(path),
            slots: Mutex::new(slots),
            wallet: Mutex::new(snapshot.wallet),
            mirror: Mutex::new(mirror),
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn slot(&self, actor: &ActorId) -> Result<Slot, BackendError> {
        let mut slots = lock(&self.slots, "local slot table")?;
        Ok(slots.entry(actor.clone()).or_default().clone())
    }

    /// Write the snapshot with `actor`'s entry replaced by `record`.
    ///
    /// On failure the mirror entry is put back; the caller restores the wallet.
    fn persist_cat(
        &self,
        actor: &ActorId,
        record: &CatRecord,
        wallet: &MockWallet,
    ) -> Result<(), BackendError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut mirror = lock(&self.mirror, "local mirror")?;
        let key = cat_key(actor);
        let previous = mirror.insert(key.clone(), record.view());
        if let Err(err) = write_snapshot(path, &mirror, wallet) {
            match previous {
                Some(view) => mirror.insert(key, view),
                None => mirror.remove(&key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn persist_wallet(&self, wallet: &MockWallet) -> Result<(), BackendError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mirror = lock(&self.mirror, "local mirror")?;
        write_snapshot(path, &mirror, wallet)
    }

    /// Plan, charge and persist under `actor`'s slot lock.
    ///
    /// The wallet is only locked when the transition charges or when there is a
    /// snapshot to write. In memory, create/check-in/lose-life touch nothing but
    /// the actor's own slot.
    fn commit_in_slot(
        &self,
        slot: &Slot,
        actor: &ActorId,
        plan: &mut Plan<'_>,
    ) -> Result<Transition, CatError> {
        let mut current = lock(slot, "local cat slot")?;
        let transition = plan(current.as_ref())?;

        if transition.charge.is_some() || self.path.is_some() {
            let mut wallet = lock(&self.wallet, "local wallet")?;
            let before = wallet.clone();
            if let Some(price) = transition.charge
                && let Err(err) = settle(&mut *wallet, actor, &self.treasury, price)
            {
                *wallet = before;
                return Err(err);
            }
            if let Err(err) = self.persist_cat(actor, &transition.record, &wallet) {
                *wallet = before;
                return Err(err.into());
            }
        }

        *current = Some(transition.record);
        debug!(actor = %actor, event = transition.event.name(), "Local store committed");
        Ok(transition)
    }

    /// Drop a slot that a rejected commit created for an actor with no cat.
    ///
    /// Every handle is cloned under the table lock, so holding it and seeing
    /// only the table's reference plus `slot` means no one else can reach it.
    fn release_empty_slot(&self, actor: &ActorId, slot: Slot) {
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        if Arc::strong_count(&slot) == 2 && slot.lock().is_ok_and(|record| record.is_none()) {
            slots.remove(actor);
        }
    }

    /// Apply `f` to the wallet and persist, undoing the change if the write fails.
    fn update_wallet<T>(
        &self,
        f: impl FnOnce(&mut MockWallet) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut wallet = lock(&self.wallet, "local wallet")?;
        let before = wallet.clone();
        let value = f(&mut wallet)?;
        if let Err(err) = self.persist_wallet(&wallet) {
            *wallet = before;
            return Err(err);
        }
        Ok(value)
    }
}

fn decode_entry(key: &str, view: CatView) -> Result<(ActorId, CatRecord), BackendError> {
    let address = key
        .strip_prefix(CAT_KEY_PREFIX)
        .ok_or_else(|| BackendError::corrupt(key, "key does not start with cat_"))?;
    let actor = ActorId::parse(address).map_err(|e| BackendError::corrupt(key, e))?;
    let record = CatRecord::try_from(view).map_err(|e| BackendError::corrupt(key, e))?;
    Ok((actor, record))
}

fn write_snapshot(
    path: &Path,
    cats: &BTreeMap<String, CatView>,
    wallet: &MockWallet,
) -> Result<(), BackendError> {
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        cats,
        wallet,
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| BackendError::storage("encode snapshot", e))?;
    atomic_write(path, &bytes).map_err(|e| {
        warn!(path = %path.display(), "Snapshot write failed: {e}");
        BackendError::storage(format!("write snapshot {}", path.display()), e)
    })
}

impl CatBackend for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn treasury(&self) -> &ActorId {
        &self.treasury
    }

    fn load(&self, actor: &ActorId) -> Result<Option<CatRecord>, BackendError> {
        let slot = {
            let slots = lock(&self.slots, "local slot table")?;
            match slots.get(actor) {
                Some(slot) => slot.clone(),
                None => return Ok(None),
            }
        };
        let record = *lock(&slot, "local cat slot")?;
        Ok(record)
    }

    fn commit(&self, actor: &ActorId, plan: &mut Plan<'_>) -> Result<Transition, CatError> {
        let slot = self.slot(actor)?;
        let result = self.commit_in_slot(&slot, actor, plan);
        if result.is_err() {
            self.release_empty_slot(actor, slot);
        }
        result
    }

    fn balance_of(&self, actor: &ActorId) -> Result<TokenAmount, BackendError> {
        lock(&self.wallet, "local wallet")?.balance(actor)
    }

    fn allowance_of(&self, owner: &ActorId) -> Result<TokenAmount, BackendError> {
        lock(&self.wallet, "local wallet")?.allowance(owner)
    }

    fn mint(&self, actor: &ActorId, amount: TokenAmount) -> Result<TokenAmount, BackendError> {
        self.update_wallet(|wallet| wallet.credit(actor, amount))
    }

    fn approve(&self, owner: &ActorId, amount: TokenAmount) -> Result<(), BackendError> {
        self.update_wallet(|wallet| wallet.set_allowance(owner, amount))
    }

    fn set_frozen(&self, actor: &ActorId, frozen: bool) -> Result<(), BackendError> {
        self.update_wallet(|wallet| {
            if frozen {
                wallet.frozen.insert(actor.clone());
            } else {
                wallet.frozen.remove(actor);
            }
            Ok(())
        })
    }
}
