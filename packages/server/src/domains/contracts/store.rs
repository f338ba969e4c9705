//! In-memory contract store.
//!
//! The store is the single lock domain for contract state. Every read takes the
//! shared lock, every mutation (eviction included) takes the exclusive lock, and
//! no lock is ever held across an `.await`. Records are kept behind `Arc` so a
//! reader's snapshot is never affected by a later write: mutations replace the
//! entry copy-on-write.
//!
//! Capacity is bounded by [`StoreConfig::max_contracts`]. When a `create` pushes
//! the store over the bound, the oldest records (by `created_at`, ties broken by
//! id) are evicted in the same critical section. Evicting a record that is
//! still processing silently drops its in-flight job; the job's eventual
//! terminal write becomes a no-op against an absent id.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::error::StoreError;
use super::models::{Contract, ContractId, ContractStatus};

pub const DEFAULT_MAX_CONTRACTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of retained records, 0 = unlimited
    pub max_contracts: usize,
}

impl StoreConfig {
    /// Signed capacity as read from configuration; negative values clamp to 0 (unlimited).
    pub fn from_signed(max_contracts: i64) -> Self {
        Self {
            max_contracts: usize::try_from(max_contracts).unwrap_or(0),
        }
    }

    pub fn unlimited() -> Self {
        Self { max_contracts: 0 }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_contracts: DEFAULT_MAX_CONTRACTS,
        }
    }
}

/// What a mutation did. Callers log it; none of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// No record with that id (deleted or evicted)
    Missing,
    /// Record already Completed or Failed
    Terminal,
    /// Transition not allowed from the current state
    Rejected,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

pub struct ContractStore {
    contracts: RwLock<HashMap<ContractId, Arc<Contract>>>,
    config: StoreConfig,
}

impl Default for ContractStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl ContractStore {
    pub fn new(config: StoreConfig) -> Self {
        info!(max_contracts = config.max_contracts, "Contract store initialized");
        Self {
            contracts: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ContractId, Arc<Contract>>> {
        self.contracts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ContractId, Arc<Contract>>> {
        self.contracts.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a new record, then evict down to capacity.
    pub fn create(&self, contract: Contract) -> Result<Arc<Contract>, StoreError> {
        let mut contracts = self.write();

        if contracts.contains_key(&contract.id) {
            return Err(StoreError::DuplicateId(contract.id));
        }

        let record = Arc::new(contract);
        contracts.insert(record.id, Arc::clone(&record));
        debug!(contract_id = %record.id, tenant = %record.tenant, "Contract created");

        Self::evict_oldest(&mut contracts, self.config.max_contracts);

        Ok(record)
    }

    fn evict_oldest(contracts: &mut HashMap<ContractId, Arc<Contract>>, max_contracts: usize) {
        if max_contracts == 0 || contracts.len() <= max_contracts {
            return;
        }

        let mut by_age: Vec<_> = contracts.values().map(|c| (c.created_at, c.id)).collect();
        by_age.sort_unstable();

        let excess = contracts.len() - max_contracts;
        for (_, id) in by_age.into_iter().take(excess) {
            let Some(evicted) = contracts.remove(&id) else {
                continue;
            };
            if evicted.status.is_terminal() {
                info!(contract_id = %id, status = %evicted.status, "Evicted contract");
            } else {
                warn!(
                    contract_id = %id,
                    status = %evicted.status,
                    "Evicted contract with job still in flight"
                );
            }
        }
    }

    pub fn get(&self, id: &ContractId) -> Option<Arc<Contract>> {
        self.read().get(id).cloned()
    }

    /// Snapshot of a tenant's records, in no particular order.
    pub fn list_by_tenant(&self, tenant: &str) -> Vec<Arc<Contract>> {
        self.read()
            .values()
            .filter(|c| c.tenant == tenant)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Move a record to `status`.
    ///
    /// `Failed` stores `error_detail` (a generic message when none is given).
    /// `Completed` through this call carries no payload; use [`Self::update_result`]
    /// to complete with one.
    pub fn update_status(
        &self,
        id: &ContractId,
        status: ContractStatus,
        error_detail: Option<String>,
    ) -> UpdateOutcome {
        self.mutate(id, |contract| {
            if contract.status.is_terminal() {
                return UpdateOutcome::Terminal;
            }
            if !contract.status.can_transition_to(status) {
                return UpdateOutcome::Rejected;
            }

            contract.status = status;
            contract.result = None;
            contract.error_detail = match status {
                ContractStatus::Failed => {
                    Some(error_detail.unwrap_or_else(|| "unknown error".to_string()))
                }
                _ => None,
            };
            UpdateOutcome::Applied
        })
    }

    /// Complete a record with its extraction payload.
    pub fn update_result(&self, id: &ContractId, payload: Value) -> UpdateOutcome {
        self.mutate(id, |contract| {
            if contract.status.is_terminal() {
                return UpdateOutcome::Terminal;
            }

            contract.status = ContractStatus::Completed;
            contract.result = Some(payload);
            contract.error_detail = None;
            UpdateOutcome::Applied
        })
    }

    /// Record the provider job id. Set at most once, never cleared.
    pub fn attach_job(&self, id: &ContractId, external_job_id: &str) -> UpdateOutcome {
        self.mutate(id, |contract| {
            if contract.external_job_id.is_some() {
                return UpdateOutcome::Rejected;
            }
            contract.external_job_id = Some(external_job_id.to_string());
            UpdateOutcome::Applied
        })
    }

    /// Remove a record. Returns whether it was present; deleting twice is fine.
    pub fn delete(&self, id: &ContractId) -> bool {
        self.write().remove(id).is_some()
    }

    fn mutate<F>(&self, id: &ContractId, apply: F) -> UpdateOutcome
    where
        F: FnOnce(&mut Contract) -> UpdateOutcome,
    {
        let mut contracts = self.write();
        let Some(entry) = contracts.get_mut(id) else {
            return UpdateOutcome::Missing;
        };

        // Decide on a scratch copy so a refused update never touches the entry.
        let mut next = Contract::clone(entry);
        let outcome = apply(&mut next);
        if outcome.is_applied() {
            next.updated_at = Utc::now().max(entry.updated_at);
            *entry = Arc::new(next);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use std::thread;

    fn contract(tenant: &str) -> Contract {
        Contract::new(ContractId::new(), tenant, "contract.pdf", "https://files/contract.pdf")
    }

    fn aged(tenant: &str, seconds: i64) -> Contract {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        contract(tenant).with_created_at(base + Duration::seconds(seconds))
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let store = ContractStore::new(StoreConfig::unlimited());
        let first = contract("t1");
        let dup = first.clone();

        store.create(first).unwrap();
        assert_eq!(store.create(dup.clone()), Err(StoreError::DuplicateId(dup.id)));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_get_and_delete_are_idempotent() {
        let store = ContractStore::default();
        let c = store.create(contract("t1")).unwrap();

        assert_eq!(store.get(&c.id).unwrap().filename, "contract.pdf");
        assert!(store.delete(&c.id));
        assert!(!store.delete(&c.id));
        assert!(store.get(&c.id).is_none());
    }

    #[test]
    fn test_list_by_tenant_only_returns_tenant_records() {
        let store = ContractStore::new(StoreConfig::unlimited());
        for _ in 0..3 {
            store.create(contract("alpha")).unwrap();
        }
        for _ in 0..2 {
            store.create(contract("beta")).unwrap();
        }

        let alpha = store.list_by_tenant("alpha");
        assert_eq!(alpha.len(), 3);
        assert!(alpha.iter().all(|c| c.tenant == "alpha"));
        assert_eq!(store.list_by_tenant("beta").len(), 2);
        assert!(store.list_by_tenant("gamma").is_empty());
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let store = ContractStore::new(StoreConfig { max_contracts: 3 });

        // Insert out of age order
        let ages = [50, 10, 40, 20, 30];
        let mut ids = Vec::new();
        for age in ages {
            ids.push((age, store.create(aged("t", age)).unwrap().id));
            assert!(store.count() <= 3);
        }

        assert_eq!(store.count(), 3);
        for (age, id) in ids {
            assert_eq!(store.get(&id).is_some(), age >= 30, "age {}", age);
        }
    }

    #[test]
    fn test_eviction_ties_broken_by_id() {
        let store = ContractStore::new(StoreConfig { max_contracts: 1 });
        let a = aged("t", 0);
        let b = aged("t", 0);
        let (low, high) = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };

        store.create(a).unwrap();
        store.create(b).unwrap();

        assert!(store.get(&low).is_none());
        assert!(store.get(&high).is_some());
    }

    #[test]
    fn test_zero_capacity_is_unlimited() {
        let store = ContractStore::new(StoreConfig::from_signed(-5));
        assert_eq!(store.config().max_contracts, 0);
        for _ in 0..250 {
            store.create(contract("t")).unwrap();
        }
        assert_eq!(store.count(), 250);
    }

    #[test]
    fn test_eviction_drops_in_flight_records() {
        let store = ContractStore::new(StoreConfig { max_contracts: 1 });
        let old = store.create(aged("t", 0)).unwrap();
        store.update_status(&old.id, ContractStatus::Processing, None);

        store.create(aged("t", 1)).unwrap();

        assert!(store.get(&old.id).is_none());
        assert_eq!(
            store.update_result(&old.id, json!({"late": true})),
            UpdateOutcome::Missing
        );
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_updates_on_missing_id_are_noops() {
        let store = ContractStore::default();
        let id = ContractId::new();

        assert_eq!(
            store.update_status(&id, ContractStatus::Failed, Some("x".into())),
            UpdateOutcome::Missing
        );
        assert_eq!(store.update_result(&id, json!(1)), UpdateOutcome::Missing);
        assert_eq!(store.attach_job(&id, "job"), UpdateOutcome::Missing);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_status_never_moves_backward() {
        let store = ContractStore::default();
        let c = store.create(contract("t")).unwrap();

        assert!(store.update_status(&c.id, ContractStatus::Processing, None).is_applied());
        assert_eq!(
            store.update_status(&c.id, ContractStatus::Pending, None),
            UpdateOutcome::Rejected
        );
        assert_eq!(store.get(&c.id).unwrap().status, ContractStatus::Processing);
    }

    #[test]
    fn test_terminal_states_absorb_updates() {
        let store = ContractStore::default();
        let c = store.create(contract("t")).unwrap();
        store.update_status(&c.id, ContractStatus::Processing, None);
        assert!(store.update_result(&c.id, json!({"pages": 3})).is_applied());

        let before = store.get(&c.id).unwrap();
        assert_eq!(
            store.update_status(&c.id, ContractStatus::Failed, Some("late".into())),
            UpdateOutcome::Terminal
        );
        assert_eq!(
            store.update_result(&c.id, json!({"pages": 99})),
            UpdateOutcome::Terminal
        );

        let after = store.get(&c.id).unwrap();
        assert_eq!(after.status, ContractStatus::Completed);
        assert_eq!(after.result, Some(json!({"pages": 3})));
        assert!(after.error_detail.is_none());
        assert_eq!(before.updated_at, after.updated_at);
    }

    #[test]
    fn test_result_and_error_are_mutually_exclusive() {
        let store = ContractStore::default();

        let ok = store.create(contract("t")).unwrap();
        store.update_status(&ok.id, ContractStatus::Processing, None);
        store.update_result(&ok.id, json!([1, 2]));
        let ok = store.get(&ok.id).unwrap();
        assert!(ok.result.is_some() && ok.error_detail.is_none());

        let failed = store.create(contract("t")).unwrap();
        store.update_status(&failed.id, ContractStatus::Processing, None);
        store.update_status(&failed.id, ContractStatus::Failed, None);
        let failed = store.get(&failed.id).unwrap();
        assert!(failed.result.is_none());
        assert_eq!(failed.error_detail.as_deref(), Some("unknown error"));

        let processing = store.create(contract("t")).unwrap();
        store.update_status(&processing.id, ContractStatus::Processing, None);
        let processing = store.get(&processing.id).unwrap();
        assert!(processing.result.is_none() && processing.error_detail.is_none());
    }

    #[test]
    fn test_attach_job_sets_once() {
        let store = ContractStore::default();
        let c = store.create(contract("t")).unwrap();

        assert!(store.attach_job(&c.id, "job-1").is_applied());
        assert_eq!(store.attach_job(&c.id, "job-2"), UpdateOutcome::Rejected);
        assert_eq!(
            store.get(&c.id).unwrap().external_job_id.as_deref(),
            Some("job-1")
        );
    }

    #[test]
    fn test_updated_at_is_monotonic() {
        let store = ContractStore::default();
        let future = Utc::now() + Duration::hours(1);
        let c = store.create(contract("t").with_created_at(future)).unwrap();

        store.update_status(&c.id, ContractStatus::Processing, None);
        let after = store.get(&c.id).unwrap();
        assert!(after.updated_at >= after.created_at);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_write() {
        let store = ContractStore::default();
        let c = store.create(contract("t")).unwrap();
        let snapshot = store.get(&c.id).unwrap();

        store.update_status(&c.id, ContractStatus::Processing, None);

        assert_eq!(snapshot.status, ContractStatus::Pending);
        assert_eq!(store.get(&c.id).unwrap().status, ContractStatus::Processing);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let store = Arc::new(ContractStore::new(StoreConfig { max_contracts: 50 }));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let tenant = format!("tenant-{}", n % 2);
                    for _ in 0..100 {
                        let c = store.create(contract(&tenant)).unwrap();
                        store.update_status(&c.id, ContractStatus::Processing, None);
                        store.update_result(&c.id, json!({"n": n}));
                        for listed in store.list_by_tenant(&tenant) {
                            assert_eq!(listed.tenant, tenant);
                            assert_eq!(
                                listed.result.is_some(),
                                listed.status == ContractStatus::Completed
                            );
                        }
                        assert!(store.count() <= 50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count(), 50);
    }
}
