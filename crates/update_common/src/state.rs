//! Update pipeline states
//!
//! Every state carries a display name for the UI and an outcome class:
//! Unknown while work is pending, True for a good terminal, False for a
//! failed terminal.

use crate::tristate::TriState;
use serde::{Deserialize, Serialize};

/// States of the update verification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    #[default]
    None,
    Init,
    QueryDns,
    DnsFailed,
    CheckVersion,
    UpToDate,
    BackInTime,
    NoUpdateInfoFound,
    Download,
    DownloadFailed,
    CheckHash,
    BadHash,
    ImportPubkeys,
    PubkeyImportFailed,
    FetchGitianSigs,
    VerifyGitianSignatures,
    NoGitianSigs,
    NotEnoughGitianSigs,
    BadGitianSigs,
    ValidUpdate,
}

impl UpdateState {
    /// Human-readable state name shown to the user.
    pub fn display_name(self) -> &'static str {
        match self {
            UpdateState::None => "None",
            UpdateState::Init => "Initializing",
            UpdateState::QueryDns => "Querying DNS",
            UpdateState::DnsFailed => "DNS check failed",
            UpdateState::CheckVersion => "Checking version",
            UpdateState::UpToDate => "We are up to date",
            UpdateState::BackInTime => "Only old versions found",
            UpdateState::NoUpdateInfoFound => "No update information found",
            UpdateState::Download => "Downloading update",
            UpdateState::DownloadFailed => "Download failed",
            UpdateState::CheckHash => "Checking hash",
            UpdateState::BadHash => "Invalid hash",
            UpdateState::ImportPubkeys => "Importing public keys",
            UpdateState::PubkeyImportFailed => "Failed to import public keys",
            UpdateState::FetchGitianSigs => "Fetching Gitian signatures",
            UpdateState::VerifyGitianSignatures => "Verifying Gitian signatures",
            UpdateState::NoGitianSigs => "No Gitian signatures found",
            UpdateState::NotEnoughGitianSigs => "Not enough matching Gitian signatures found",
            UpdateState::BadGitianSigs => "At least one Gitian signature was invalid",
            UpdateState::ValidUpdate => "Valid update downloaded and verified",
        }
    }

    /// Outcome class for UI summarization.
    pub fn outcome(self) -> TriState {
        match self {
            UpdateState::None
            | UpdateState::Init
            | UpdateState::QueryDns
            | UpdateState::CheckVersion
            | UpdateState::Download
            | UpdateState::CheckHash
            | UpdateState::ImportPubkeys
            | UpdateState::FetchGitianSigs
            | UpdateState::VerifyGitianSignatures => TriState::Unknown,

            UpdateState::UpToDate | UpdateState::BackInTime | UpdateState::ValidUpdate => {
                TriState::True
            }

            UpdateState::DnsFailed
            | UpdateState::NoUpdateInfoFound
            | UpdateState::DownloadFailed
            | UpdateState::BadHash
            | UpdateState::PubkeyImportFailed
            | UpdateState::NoGitianSigs
            | UpdateState::NotEnoughGitianSigs
            | UpdateState::BadGitianSigs => TriState::False,
        }
    }

    /// Terminal states have no outgoing transitions except the explicit
    /// DownloadFailed -> Download retry edge.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UpdateState::DnsFailed
                | UpdateState::UpToDate
                | UpdateState::BackInTime
                | UpdateState::NoUpdateInfoFound
                | UpdateState::DownloadFailed
                | UpdateState::BadHash
                | UpdateState::PubkeyImportFailed
                | UpdateState::NoGitianSigs
                | UpdateState::NotEnoughGitianSigs
                | UpdateState::BadGitianSigs
                | UpdateState::ValidUpdate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classes() {
        assert_eq!(UpdateState::Init.outcome(), TriState::Unknown);
        assert_eq!(UpdateState::QueryDns.outcome(), TriState::Unknown);
        assert_eq!(UpdateState::UpToDate.outcome(), TriState::True);
        assert_eq!(UpdateState::BackInTime.outcome(), TriState::True);
        assert_eq!(UpdateState::ValidUpdate.outcome(), TriState::True);
        assert_eq!(UpdateState::DnsFailed.outcome(), TriState::False);
        assert_eq!(UpdateState::BadGitianSigs.outcome(), TriState::False);
        assert_eq!(UpdateState::NotEnoughGitianSigs.outcome(), TriState::False);
    }

    #[test]
    fn test_terminal_states_have_definite_outcome() {
        let all = [
            UpdateState::None,
            UpdateState::Init,
            UpdateState::QueryDns,
            UpdateState::DnsFailed,
            UpdateState::CheckVersion,
            UpdateState::UpToDate,
            UpdateState::BackInTime,
            UpdateState::NoUpdateInfoFound,
            UpdateState::Download,
            UpdateState::DownloadFailed,
            UpdateState::CheckHash,
            UpdateState::BadHash,
            UpdateState::ImportPubkeys,
            UpdateState::PubkeyImportFailed,
            UpdateState::FetchGitianSigs,
            UpdateState::VerifyGitianSignatures,
            UpdateState::NoGitianSigs,
            UpdateState::NotEnoughGitianSigs,
            UpdateState::BadGitianSigs,
            UpdateState::ValidUpdate,
        ];
        for state in all {
            if state.is_terminal() {
                assert_ne!(state.outcome(), TriState::Unknown, "{state:?}");
            }
        }
    }

    #[test]
    fn test_display_names_unique() {
        use std::collections::HashSet;
        let names: HashSet<&str> = [
            UpdateState::None,
            UpdateState::Init,
            UpdateState::QueryDns,
            UpdateState::DnsFailed,
            UpdateState::CheckVersion,
            UpdateState::UpToDate,
            UpdateState::BackInTime,
            UpdateState::NoUpdateInfoFound,
            UpdateState::Download,
            UpdateState::DownloadFailed,
            UpdateState::CheckHash,
            UpdateState::BadHash,
            UpdateState::ImportPubkeys,
            UpdateState::PubkeyImportFailed,
            UpdateState::FetchGitianSigs,
            UpdateState::VerifyGitianSignatures,
            UpdateState::NoGitianSigs,
            UpdateState::NotEnoughGitianSigs,
            UpdateState::BadGitianSigs,
            UpdateState::ValidUpdate,
        ]
        .iter()
        .map(|s| s.display_name())
        .collect();
        assert_eq!(names.len(), 20);
    }
}
