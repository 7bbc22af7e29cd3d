//! Gitian attestation discovery and parsing
//!
//! Attestations live in a public git repository, one directory per
//! `v<version>-<platform>`, one subdirectory per builder. Discovery scrapes
//! the directory listing HTML for user links; verification parses the
//! fetched assertion files for the artifact hash line.

use regex::Regex;
use std::sync::LazyLock;

/// Repository paths for one version/platform attestation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationUrls {
    /// Listing page path, also the href prefix of user links.
    pub tree_path: String,
    /// Full listing page URL.
    pub tree_url: String,
    /// Raw file base URL; `<blob_url>/<user>/<file>` fetches one file.
    pub blob_url: String,
}

pub fn attestation_urls(version: &str, platform: &str) -> AttestationUrls {
    let tree_path = format!("/monero-project/gitian.sigs/tree/master/v{version}-{platform}");
    AttestationUrls {
        tree_url: format!("https://github.com{tree_path}"),
        blob_url: format!(
            "https://raw.githubusercontent.com/monero-project/gitian.sigs/master/v{version}-{platform}"
        ),
        tree_path,
    }
}

/// Assertion file name for one builder: `<software>-<platform>-<short_version>-build.assert`.
pub fn assert_file_name(software: &str, platform: &str, short_version: &str) -> String {
    format!("{software}-{platform}-{short_version}-build.assert")
}

static USER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,20}$").expect("static regex"));

/// Extract distinct builder names from the listing page HTML.
///
/// Scans for `href="<tree_path>/<user>"` links; tokens longer than 20
/// characters or containing anything outside `[A-Za-z0-9_-]` are dropped.
pub fn extract_users(html: &str, tree_path: &str) -> Vec<String> {
    let link_prefix = format!("href=\"{tree_path}");
    let mut users: Vec<String> = Vec::new();

    let mut idx = 0;
    while let Some(found) = html[idx..].find(&link_prefix) {
        let start = idx + found + link_prefix.len();
        let Some(quote) = html[start..].find('"') else {
            break;
        };
        let token = &html[start..start + quote];
        idx = start + quote;

        // token still carries the leading path separator
        let Some(user) = token.strip_prefix('/') else {
            continue;
        };
        if USER_TOKEN.is_match(user) && !users.iter().any(|u| u == user) {
            users.push(user.to_string());
        }
    }

    users
}

/// Compile the assertion hash-line pattern for one artifact file name:
/// a hex hash, exactly two spaces, the file name, end of line.
pub fn assert_line_regex(artifact_filename: &str) -> Regex {
    let pattern = format!("([a-fA-F0-9]+)  {}$", regex::escape(artifact_filename));
    Regex::new(&pattern).expect("escaped filename pattern")
}

/// Find the artifact hash asserted for `artifact_filename`. Later matching
/// lines override earlier ones; non-matching lines are ignored.
pub fn extract_assert_hash(contents: &str, line_regex: &Regex) -> Option<String> {
    let mut hash = None;
    for line in contents.lines() {
        if let Some(caps) = line_regex.captures(line) {
            hash = Some(caps[1].to_string());
        }
    }
    hash
}
