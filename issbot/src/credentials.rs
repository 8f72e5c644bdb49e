//! Read-only credential storage.
//!
//! One record per entity, keyed by the municipal registration id. The store
//! is built once at process start and shared across concurrent tasks behind
//! an `Arc`; it is never mutated afterwards, so no locking is involved.

use std::collections::HashMap;
use tracing::warn;

/// Sign-in material for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Municipal registration id, the lookup key.
    pub entity_id: String,
    /// Login principal (tax id or registration, portal-dependent).
    pub principal: String,
    /// Numeric secret entered through the virtual keypad.
    pub secret: String,
    /// Secondary id some filter forms ask for (e.g. the federal tax id).
    pub auxiliary_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct CredentialStore {
    records: HashMap<String, CredentialRecord>,
}

impl CredentialStore {
    pub fn new(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.entity_id.clone(), r))
                .collect(),
        }
    }

    /// Build the store from numbered environment slots:
    /// `PORTAL_ENTITY_n` / `PORTAL_USER_n` / `PORTAL_PASS_n` and optional
    /// `PORTAL_TAXID_n`, for n starting at 1. Scanning stops at the first
    /// slot with no entity id; slots missing user or pass are skipped with a
    /// warning so one bad entry does not take down the rest.
    pub fn from_env() -> Self {
        let mut records = Vec::new();
        for slot in 1.. {
            let Ok(entity_id) = std::env::var(format!("PORTAL_ENTITY_{slot}")) else {
                break;
            };
            let principal = std::env::var(format!("PORTAL_USER_{slot}"));
            let secret = std::env::var(format!("PORTAL_PASS_{slot}"));
            match (principal, secret) {
                (Ok(principal), Ok(secret)) => {
                    records.push(CredentialRecord {
                        entity_id,
                        principal,
                        secret,
                        auxiliary_id: std::env::var(format!("PORTAL_TAXID_{slot}")).ok(),
                    });
                }
                _ => {
                    warn!(slot, "credential slot is incomplete, skipping");
                }
            }
        }
        Self::new(records)
    }

    pub fn lookup(&self, entity_id: &str) -> Option<&CredentialRecord> {
        self.records.get(entity_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
