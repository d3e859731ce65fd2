use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::archive::{ArchiveError, ArchivedLedger, MongoArchive};
use crate::auth::{AuthUser, IdentityProvider};
use crate::ledger::LedgerStore;
use crate::sample::sample_ledger;
use crate::schemas::{Member, MemberId, UserId, DEFAULT_AVATAR_URL};

/// Everything the handlers share: the identity provider and one ledger per
/// signed-in user.
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    ledgers: Mutex<HashMap<UserId, LedgerStore>>,
    archive: Option<MongoArchive>,
    seed_sample_data: bool,
}

pub fn owner_member(user: &AuthUser) -> Member {
    Member {
        id: MemberId::for_user(&user.id),
        name: user.display_name.clone(),
        initials: user.initials.clone(),
        avatar_url: DEFAULT_AVATAR_URL.to_string(),
    }
}

impl AppState {
    /// Sample data is only served to in-memory ledgers; it would never
    /// match what an archive holds.
    pub fn new(identity: Arc<dyn IdentityProvider>, archive: Option<MongoArchive>, seed_sample_data: bool) -> Self {
        if seed_sample_data && archive.is_some() {
            tracing::warn!("sample data is not seeded while an archive is configured");
        }
        Self {
            identity,
            ledgers: Mutex::new(HashMap::new()),
            seed_sample_data: seed_sample_data && archive.is_none(),
            archive,
        }
    }

    pub fn seeds_sample_data(&self) -> bool {
        self.seed_sample_data
    }

    pub fn archive(&self) -> Option<&MongoArchive> {
        self.archive.as_ref()
    }

    fn is_open(&self, user: &AuthUser) -> bool {
        self.ledgers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&user.id)
    }

    /// Makes sure the user's ledger is in memory, loading it from the
    /// archive the first time. A failed load caches nothing, so the next
    /// request tries again.
    pub async fn open_ledger(&self, user: &AuthUser) -> Result<(), ArchiveError> {
        if self.is_open(user) {
            return Ok(());
        }

        let owner = owner_member(user);
        let archived = match &self.archive {
            Some(archive) => archive.load(&user.id).await.map_err(|err| {
                tracing::warn!(user = %user.id, %err, "couldn't load the archived ledger");
                err
            })?,
            None => ArchivedLedger::default(),
        };
        let ledger = if !archived.is_empty() {
            tracing::info!(
                user = %user.id,
                expenses = archived.expenses.len(),
                groups = archived.groups.len(),
                "ledger loaded"
            );
            let mut ledger = LedgerStore::from_parts(owner, archived.expenses, archived.groups);
            if let Some(preferences) = archived.preferences {
                ledger.set_preferences(preferences);
            }
            ledger
        } else if self.seed_sample_data {
            sample_ledger(owner)
        } else {
            LedgerStore::new(owner)
        };

        self.ledgers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user.id.clone())
            .or_insert(ledger);
        Ok(())
    }

    pub fn read<R>(&self, user: &AuthUser, f: impl FnOnce(&LedgerStore) -> R) -> R {
        self.write(user, |ledger| f(ledger))
    }

    pub fn write<R>(&self, user: &AuthUser, f: impl FnOnce(&mut LedgerStore) -> R) -> R {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let ledger = ledgers
            .entry(user.id.clone())
            .or_insert_with(|| LedgerStore::new(owner_member(user)));
        f(ledger)
    }
}
