//! Update Common - secure update verification pipeline
//!
//! Given a software name and buildtag, discovers whether a newer release
//! exists and accepts it only after a multi-layer trust check:
//! - two independent DNSSEC-validated domains announcing the identical
//!   TXT record set
//! - a quorum of valid reproducible-build attestations signed by
//!   allow-listed maintainer keys
//! - a SHA-256 match between announcement and downloaded artifact
//!
//! The driver is a long-lived worker walking a state machine; observers
//! follow progress through the shared status record and its event bus.
//! Transport and crypto (DNS, HTTP, SHA-256, OpenPGP) are injected
//! collaborators, so tests script them.

pub mod dns_resolver;
pub mod events;
pub mod gitian;
pub mod gpg_engine;
pub mod http_fetcher;
pub mod pubkeys;
pub mod records;
pub mod sha256sum;
pub mod state;
pub mod status;
pub mod tristate;
pub mod update_urls;
pub mod updater;
pub mod vercmp;

pub use dns_resolver::{DnsQueryResult, HickoryTxtResolver, TxtResolver};
pub use events::{EventBus, UpdateEvent};
pub use gpg_engine::{
    GpgCommandEngine, GpgEngineFactory, PgpEngine, PgpEngineFactory, PgpError, SignatureCheck,
};
pub use http_fetcher::{DownloadHandle, Fetcher, ProgressFn, ReqwestFetcher, ResultFn};
pub use pubkeys::{load_trusted_keys, TrustedKey};
pub use records::{select_version, VersionRecord, VersionSelection};
pub use state::UpdateState;
pub use status::{Status, StatusSnapshot, MIN_VALID_GITIAN_SIGS};
pub use tristate::TriState;
pub use update_urls::{detect_build_tag, DownloadsUrlBuilder, UpdateUrlBuilder};
pub use updater::{Collaborators, Updater, UpdaterConfig, DNS_URLS};
pub use vercmp::vercmp;
