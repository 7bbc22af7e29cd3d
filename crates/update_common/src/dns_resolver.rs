//! DNSSEC-validating TXT lookups
//!
//! The resolver collaborator never errors: failures fold into the
//! (available, valid) flags so the quorum logic can reason over all
//! domains uniformly. `valid` means the DNSSEC chain validated end-to-end.

use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::Resolver;
use tracing::debug;

/// TXT query outcome for one authoritative domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsQueryResult {
    pub records: Vec<String>,
    /// The domain answered at all.
    pub available: bool,
    /// DNSSEC validation passed.
    pub valid: bool,
}

/// DNS collaborator interface.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    async fn txt_query(&self, host: &str) -> DnsQueryResult;
}

/// Record-set equality ignoring element order; resolver reordering must
/// not break the quorum.
pub fn records_match(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

fn usable(result: &DnsQueryResult) -> bool {
    result.available && result.valid && !result.records.is_empty()
}

/// Count of domains with validated, non-empty record sets.
pub fn count_valid(results: &[DnsQueryResult]) -> usize {
    results.iter().filter(|r| usable(r)).count()
}

/// Smallest index `i` in source order whose validated record set is
/// matched by some later domain `j > i`. Depends only on the record-set
/// multiset, never on traversal order.
pub fn find_quorum_index(results: &[DnsQueryResult]) -> Option<usize> {
    for i in 0..results.len().saturating_sub(1) {
        if !usable(&results[i]) {
            continue;
        }
        for j in (i + 1)..results.len() {
            if records_match(&results[i].records, &results[j].records) {
                return Some(i);
            }
        }
    }
    None
}

/// Production resolver on hickory. One validating resolver decides
/// `valid`; a plain fallback lookup distinguishes a domain that answered
/// with records that failed validation from one that did not answer.
pub struct HickoryTxtResolver {
    validating: Resolver<TokioConnectionProvider>,
    plain: Resolver<TokioConnectionProvider>,
}

impl HickoryTxtResolver {
    pub fn new() -> Self {
        let mut builder = Resolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        );
        builder.options_mut().validate = true;
        let validating = builder.build();

        let plain = Resolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
        .build();

        Self { validating, plain }
    }
}

impl Default for HickoryTxtResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn txt_query(&self, host: &str) -> DnsQueryResult {
        match self.validating.txt_lookup(host).await {
            Ok(lookup) => DnsQueryResult {
                records: collect_txt(lookup),
                available: true,
                valid: true,
            },
            Err(e) => {
                debug!("validating TXT lookup for {host} failed: {e}");
                match self.plain.txt_lookup(host).await {
                    Ok(lookup) => DnsQueryResult {
                        records: collect_txt(lookup),
                        available: true,
                        valid: false,
                    },
                    Err(e) => {
                        debug!("plain TXT lookup for {host} failed: {e}");
                        DnsQueryResult::default()
                    }
                }
            }
        }
    }
}

fn collect_txt(lookup: hickory_resolver::lookup::TxtLookup) -> Vec<String> {
    lookup
        .iter()
        .map(|txt| {
            txt.txt_data()
                .iter()
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect::<String>()
        })
        .collect()
}
