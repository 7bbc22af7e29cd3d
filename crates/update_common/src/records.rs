//! TXT version record parsing and version selection
//!
//! Wire format: `software:buildtag:version:hash`, exactly four
//! colon-separated fields, hash 64 alphanumeric chars (lowercase hex in
//! practice; the byte-for-byte check happens against the downloaded file).
//! Selection is deterministic: highest version wins, equal versions with
//! different hashes abort as ambiguous.

use crate::vercmp::vercmp;
use std::cmp::Ordering;

/// A parsed update announcement record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub software: String,
    pub buildtag: String,
    pub version: String,
    pub hash: String,
}

impl VersionRecord {
    /// Split a raw TXT record; anything but exactly four fields is
    /// rejected.
    pub fn parse(record: &str) -> Option<Self> {
        let fields: Vec<&str> = record.split(':').collect();
        if fields.len() != 4 {
            return None;
        }
        Some(Self {
            software: fields[0].to_string(),
            buildtag: fields[1].to_string(),
            version: fields[2].to_string(),
            hash: fields[3].to_string(),
        })
    }

    /// Shape check only: 64 alphanumeric characters. A non-hex value can
    /// never match a SHA-256 at hash-check time.
    fn has_plausible_hash(&self) -> bool {
        self.hash.len() == 64 && self.hash.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

/// Outcome of version selection over a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelection {
    /// Highest well-formed matching record.
    Selected { version: String, hash: String },
    /// Two records with the same version but different hashes.
    Ambiguous,
    /// No well-formed record matched software and buildtag.
    NoneFound,
}

/// Pick the update to install from the quorum-validated records.
///
/// Returns the selection plus the diagnostic messages produced along the
/// way, in record order, for the UI message log.
pub fn select_version(
    software: &str,
    buildtag: &str,
    records: &[String],
) -> (VersionSelection, Vec<String>) {
    let mut messages = Vec::new();
    let mut selected: Option<(String, String)> = None;

    for raw in records {
        messages.push(format!("Got record: {raw}"));

        let Some(record) = VersionRecord::parse(raw) else {
            messages.push(format!("Updates record does not have 4 fields: {raw}"));
            continue;
        };

        if record.software != software || record.buildtag != buildtag {
            continue;
        }

        if !record.has_plausible_hash() {
            messages.push(format!("Invalid hash: {}", record.hash));
            continue;
        }

        // use highest version
        if let Some((version, hash)) = &selected {
            match vercmp(version, &record.version) {
                Ordering::Greater => continue,
                Ordering::Equal if *hash != record.hash => {
                    messages.push(format!(
                        "Two matches found for {software} version {version} on {buildtag}"
                    ));
                    return (VersionSelection::Ambiguous, messages);
                }
                _ => {}
            }
        }

        messages.push(format!(
            "Found new version {} with hash {}",
            record.version, record.hash
        ));
        selected = Some((record.version, record.hash));
    }

    match selected {
        Some((version, hash)) => (VersionSelection::Selected { version, hash }, messages),
        None => (VersionSelection::NoneFound, messages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const H2: &str = "0000000000000000000000000000000000000000000000000000000000000002";

    fn rec(version: &str, hash: &str) -> String {
        format!("monero:linux-x64:{version}:{hash}")
    }

    #[test]
    fn test_parse_well_formed_record() {
        let record = VersionRecord::parse(&rec("0.18.1", H1)).unwrap();
        assert_eq!(record.software, "monero");
        assert_eq!(record.buildtag, "linux-x64");
        assert_eq!(record.version, "0.18.1");
        assert_eq!(record.hash, H1);
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert_eq!(VersionRecord::parse("monero:linux-x64:0.18.1"), None);
        assert_eq!(
            VersionRecord::parse(&format!("monero:linux-x64:0.18.1:{H1}:extra")),
            None
        );
        assert_eq!(VersionRecord::parse(""), None);
    }

    #[test]
    fn test_selects_highest_version() {
        let records = vec![rec("0.17.0", H1), rec("0.18.1", H2), rec("0.16.0", H1)];
        let (sel, _) = select_version("monero", "linux-x64", &records);
        assert_eq!(
            sel,
            VersionSelection::Selected {
                version: "0.18.1".into(),
                hash: H2.into()
            }
        );
    }

    #[test]
    fn test_selection_is_deterministic_and_idempotent() {
        let records = vec![rec("0.18.1", H2), rec("0.17.0", H1)];
        let first = select_version("monero", "linux-x64", &records);
        let second = select_version("monero", "linux-x64", &records);
        assert_eq!(first, second);
    }

    #[test]
    fn test_wrong_field_count_skipped() {
        let records = vec!["monero:linux-x64:0.18.1".to_string(), rec("0.17.0", H1)];
        let (sel, messages) = select_version("monero", "linux-x64", &records);
        assert_eq!(
            sel,
            VersionSelection::Selected {
                version: "0.17.0".into(),
                hash: H1.into()
            }
        );
        assert!(messages.iter().any(|m| m.contains("does not have 4 fields")));
    }

    #[test]
    fn test_wrong_software_or_buildtag_skipped_silently() {
        let records = vec![
            format!("monero-gui:linux-x64:0.18.1:{H1}"),
            format!("monero:win-x64:0.18.1:{H1}"),
        ];
        let (sel, messages) = select_version("monero", "linux-x64", &records);
        assert_eq!(sel, VersionSelection::NoneFound);
        assert!(!messages.iter().any(|m| m.contains("Invalid hash")));
    }

    #[test]
    fn test_bad_hash_rejected() {
        let short = "abc123";
        let with_punct = format!("{}!", &H1[..63]);
        let records = vec![rec("0.18.1", short), rec("0.18.0", &with_punct)];
        let (sel, messages) = select_version("monero", "linux-x64", &records);
        assert_eq!(sel, VersionSelection::NoneFound);
        assert_eq!(
            messages.iter().filter(|m| m.contains("Invalid hash")).count(),
            2
        );
    }

    #[test]
    fn test_equal_versions_different_hashes_ambiguous() {
        let records = vec![rec("0.18.1", H1), rec("0.18.1", H2)];
        let (sel, messages) = select_version("monero", "linux-x64", &records);
        assert_eq!(sel, VersionSelection::Ambiguous);
        assert!(messages.iter().any(|m| m.contains("Two matches found")));
    }

    #[test]
    fn test_equal_versions_same_hash_ok() {
        let records = vec![rec("0.18.1", H1), rec("0.18.1", H1)];
        let (sel, _) = select_version("monero", "linux-x64", &records);
        assert_eq!(
            sel,
            VersionSelection::Selected {
                version: "0.18.1".into(),
                hash: H1.into()
            }
        );
    }

    #[test]
    fn test_zero_padded_versions_equal() {
        // "0.18" and "0.18.0" compare equal; same hash keeps selection valid
        let records = vec![rec("0.18", H1), rec("0.18.0", H1)];
        let (sel, _) = select_version("monero", "linux-x64", &records);
        assert!(matches!(sel, VersionSelection::Selected { .. }));
    }

    #[test]
    fn test_empty_records() {
        let (sel, messages) = select_version("monero", "linux-x64", &[]);
        assert_eq!(sel, VersionSelection::NoneFound);
        assert!(messages.is_empty());
    }
}
