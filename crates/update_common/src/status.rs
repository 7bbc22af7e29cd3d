//! Shared status record
//!
//! One mutex guards every mutable field; events are published after the
//! field is updated and before the lock is released, so two observers of
//! the same event always see a consistent snapshot. Blocking work never
//! happens while the lock is held: lock, snapshot inputs, unlock, work,
//! lock, publish outputs.

use crate::events::{EventBus, UpdateEvent};
use crate::state::UpdateState;
use crate::tristate::TriState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// Signature quorum threshold: independent allow-listed attestations
/// required before an artifact is trusted.
pub const MIN_VALID_GITIAN_SIGS: u32 = 2;

/// Every mutable field of the updater, guarded by [`Status`].
#[derive(Debug, Default)]
pub struct StatusFields {
    pub state: UpdateState,
    pub next_state: UpdateState,

    pub dns_valid: TriState,
    pub hash_valid: TriState,
    pub valid_gitian_sigs: u32,
    pub min_valid_gitian_sigs: u32,
    pub total_gitian_sigs: u32,
    pub processed_gitian_sigs: u32,

    pub software: String,
    pub buildtag: String,
    pub current_version: String,
    /// Selected (highest) version from the DNS records, empty until found.
    pub version: String,
    /// Announced artifact hash, 64 lowercase hex chars.
    pub expected_hash: String,
    pub download_path: Option<PathBuf>,

    /// Append-only UI message log.
    pub messages: Vec<String>,

    pub dns_query_done: bool,
    pub version_check_done: bool,
    pub download_done: bool,
    pub download_success: bool,
    pub pubkeys_import_done: bool,
    pub pubkeys_import_success: bool,
    pub verify_sigs_done: bool,
    pub verify_sigs_success: bool,
    pub bad_gitian_signature_found: bool,

    pub good_dns_records: Vec<String>,
    /// fingerprint -> owner label, filled by the key import stage.
    pub imported_fingerprints: HashMap<String, String>,

    pub running: bool,
}

/// Point-in-time copy of the observable fields, for UI layers that poll
/// instead of subscribing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: UpdateState,
    pub state_name: String,
    pub state_outcome: TriState,
    pub selecting: bool,
    pub dns_valid: TriState,
    pub hash_valid: TriState,
    pub valid_gitian_sigs: u32,
    pub min_valid_gitian_sigs: u32,
    pub total_gitian_sigs: u32,
    pub processed_gitian_sigs: u32,
    pub software: String,
    pub buildtag: String,
    pub current_version: String,
    pub version: String,
    pub download_path: Option<PathBuf>,
    pub messages: Vec<String>,
}

/// Mutex-guarded status record plus the event bus fed by its mutators.
pub struct Status {
    inner: Mutex<StatusFields>,
    bus: EventBus,
}

impl Status {
    pub fn new(software: &str, buildtag: &str, current_version: &str) -> Self {
        let fields = StatusFields {
            software: software.to_string(),
            buildtag: buildtag.to_string(),
            current_version: current_version.to_string(),
            running: true,
            ..Default::default()
        };
        Self {
            inner: Mutex::new(fields),
            bus: EventBus::new(),
        }
    }

    /// Acquire the status lock. Mutators on the guard publish their event
    /// while the lock is still held.
    pub fn lock(&self) -> StatusGuard<'_> {
        StatusGuard {
            fields: self.inner.lock().unwrap_or_else(|e| e.into_inner()),
            bus: &self.bus,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<UpdateEvent> {
        self.bus.subscribe()
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    // Typed read accessors, each takes and drops the lock.

    pub fn state(&self) -> UpdateState {
        self.lock().state
    }

    pub fn state_name(&self) -> &'static str {
        self.state().display_name()
    }

    pub fn state_outcome(&self) -> TriState {
        self.state().outcome()
    }

    /// The UI offers the cli/gui choice only while initializing.
    pub fn selecting(&self) -> bool {
        self.state() == UpdateState::Init
    }

    pub fn dns_valid(&self) -> TriState {
        self.lock().dns_valid
    }

    pub fn hash_valid(&self) -> TriState {
        self.lock().hash_valid
    }

    pub fn version(&self) -> String {
        self.lock().version.clone()
    }

    pub fn valid_gitian_sigs(&self) -> u32 {
        self.lock().valid_gitian_sigs
    }

    pub fn min_valid_gitian_sigs(&self) -> u32 {
        self.lock().min_valid_gitian_sigs
    }

    pub fn processed_gitian_sigs(&self) -> u32 {
        self.lock().processed_gitian_sigs
    }

    pub fn total_gitian_sigs(&self) -> u32 {
        self.lock().total_gitian_sigs
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().messages.clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let guard = self.lock();
        StatusSnapshot {
            state: guard.state,
            state_name: guard.state.display_name().to_string(),
            state_outcome: guard.state.outcome(),
            selecting: guard.state == UpdateState::Init,
            dns_valid: guard.dns_valid,
            hash_valid: guard.hash_valid,
            valid_gitian_sigs: guard.valid_gitian_sigs,
            min_valid_gitian_sigs: guard.min_valid_gitian_sigs,
            total_gitian_sigs: guard.total_gitian_sigs,
            processed_gitian_sigs: guard.processed_gitian_sigs,
            software: guard.software.clone(),
            buildtag: guard.buildtag.clone(),
            current_version: guard.current_version.clone(),
            version: guard.version.clone(),
            download_path: guard.download_path.clone(),
            messages: guard.messages.clone(),
        }
    }
}

/// Write access to [`StatusFields`] with event-publishing mutators.
pub struct StatusGuard<'a> {
    fields: MutexGuard<'a, StatusFields>,
    bus: &'a EventBus,
}

impl StatusGuard<'_> {
    pub fn set_dns_valid(&mut self, t: TriState) {
        self.fields.dns_valid = t;
        self.bus.publish(UpdateEvent::DnsValidChanged(t));
    }

    pub fn set_hash_valid(&mut self, t: TriState) {
        self.fields.hash_valid = t;
        self.bus.publish(UpdateEvent::HashValidChanged(t));
    }

    pub fn set_valid_gitian_sigs(&mut self, n: u32) {
        self.fields.valid_gitian_sigs = n;
        self.bus.publish(UpdateEvent::ValidGitianSigsChanged(n));
    }

    pub fn set_min_valid_gitian_sigs(&mut self, n: u32) {
        self.fields.min_valid_gitian_sigs = n;
        self.bus.publish(UpdateEvent::MinValidGitianSigsChanged(n));
    }

    pub fn set_processed_gitian_sigs(&mut self, n: u32) {
        self.fields.processed_gitian_sigs = n;
        self.bus.publish(UpdateEvent::ProcessedGitianSigsChanged(n));
    }

    pub fn set_total_gitian_sigs(&mut self, n: u32) {
        self.fields.total_gitian_sigs = n;
        self.bus.publish(UpdateEvent::TotalGitianSigsChanged(n));
    }

    pub fn set_version(&mut self, version: &str) {
        self.fields.version = version.to_string();
        self.bus
            .publish(UpdateEvent::VersionChanged(version.to_string()));
    }

    /// Publish an event while the lock is still held, for the few events
    /// that pair with multi-field updates (download lifecycle, valid
    /// update ready).
    pub fn publish(&self, event: UpdateEvent) {
        self.bus.publish(event);
    }

    /// Commit the pending state transition, if any. State events are
    /// published while the lock is held so observers of the same event
    /// see a consistent snapshot.
    pub fn commit_pending_state(&mut self) -> Option<UpdateState> {
        if self.fields.state == self.fields.next_state {
            return None;
        }
        self.fields.state = self.fields.next_state;
        let state = self.fields.state;
        self.bus
            .publish(UpdateEvent::StateChanged(state.display_name().to_string()));
        self.bus.publish(UpdateEvent::StateOutcomeChanged(state.outcome()));
        self.bus
            .publish(UpdateEvent::SelectingChanged(state == UpdateState::Init));
        Some(state)
    }

    /// Append to the UI message log and notify observers.
    pub fn add_message(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        info!("UI message: {msg}");
        self.fields.messages.push(msg.clone());
        self.bus.publish(UpdateEvent::Message(msg));
    }
}

impl Deref for StatusGuard<'_> {
    type Target = StatusFields;

    fn deref(&self) -> &StatusFields {
        &self.fields
    }
}

impl DerefMut for StatusGuard<'_> {
    fn deref_mut(&mut self) -> &mut StatusFields {
        &mut self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mutator_emits_after_commit() {
        let status = Status::new("monero", "linux-x64", "0.17.0");
        let mut rx = status.subscribe();

        {
            let mut guard = status.lock();
            guard.set_dns_valid(TriState::True);
        }

        assert_eq!(
            rx.recv().await.unwrap(),
            UpdateEvent::DnsValidChanged(TriState::True)
        );
        assert_eq!(status.dns_valid(), TriState::True);
    }

    #[tokio::test]
    async fn test_message_log_append_only() {
        let status = Status::new("monero", "linux-x64", "");
        {
            let mut guard = status.lock();
            guard.add_message("first");
            guard.add_message("second");
        }
        assert_eq!(status.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_initial_fields() {
        let status = Status::new("monero", "linux-x64", "0.17.0");
        let guard = status.lock();
        assert_eq!(guard.state, UpdateState::None);
        assert_eq!(guard.dns_valid, TriState::Unknown);
        assert_eq!(guard.hash_valid, TriState::Unknown);
        assert_eq!(guard.valid_gitian_sigs, 0);
        assert!(guard.running);
        assert!(guard.version.is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let status = Status::new("monero-gui", "win-x64", "0.18.0");
        let snap = status.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.software, "monero-gui");
        assert_eq!(back.state_name, "None");
    }
}
