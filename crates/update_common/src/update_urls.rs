//! Artifact URL construction and build-platform mapping
//!
//! Two naming schemes meet here: the short buildtags announced in DNS
//! (`linux-x64`, `win-x64`, ...) and the toolchain triplets used by the
//! reproducible-build attestations (`x86_64-linux-gnu`, ...). Unmapped
//! buildtags pass through unchanged.

/// Base of the canonical release download location.
pub const DOWNLOAD_BASE_URL: &str = "https://downloads.getmonero.org";

/// Builds the canonical artifact URL for a release.
pub trait UpdateUrlBuilder: Send + Sync {
    fn update_url(&self, software: &str, subchannel: &str, buildtag: &str, version: &str)
        -> String;
}

/// Production URL builder for the release download server.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadsUrlBuilder;

impl UpdateUrlBuilder for DownloadsUrlBuilder {
    fn update_url(
        &self,
        software: &str,
        subchannel: &str,
        buildtag: &str,
        version: &str,
    ) -> String {
        let ext = if buildtag.starts_with("win") {
            "zip"
        } else {
            "tar.bz2"
        };
        let filename = format!("{software}-{buildtag}-v{version}.{ext}");
        // A gui build has an empty subchannel; collapse the path segment.
        if subchannel.is_empty() {
            format!("{DOWNLOAD_BASE_URL}/{filename}")
        } else {
            format!("{DOWNLOAD_BASE_URL}/{subchannel}/{filename}")
        }
    }
}

/// Sub-channel of the download location: `source` for source tarballs,
/// empty for gui bundles, `cli` otherwise.
pub fn subchannel_for(software: &str, buildtag: &str) -> &'static str {
    if buildtag.contains("-source") {
        "source"
    } else if software.ends_with("-gui") {
        ""
    } else {
        "cli"
    }
}

/// Map a DNS buildtag to the build-platform triplet used by attestation
/// artifact names. Unmapped tags pass through unchanged.
pub fn gitian_build_tag(buildtag: &str) -> &str {
    match buildtag {
        "linux-x64" => "x86_64-linux-gnu",
        "linux-x32" => "i686-linux-gnu",
        "win-x64" => "x86_64-w64-mingw32",
        "win-x32" => "i686-w64-mingw32",
        "freebsd" => "x86_64-unknown-freebsd",
        "mac-x64" => "x86_64-apple-darwin11",
        "linux-armv7" => "arm-linux-gnueabihf",
        "linux-armv8" => "aarch64-linux-gnu",
        other => other,
    }
}

/// Short platform token used in attestation directory and file names:
/// the buildtag prefix before `-`, with `mac` spelled `osx`.
pub fn short_platform(buildtag: &str) -> &str {
    let prefix = match buildtag.find('-') {
        Some(idx) => &buildtag[..idx],
        None => buildtag,
    };
    match prefix {
        "mac" => "osx",
        other => other,
    }
}

/// Buildtag of the running binary, detected at compile time.
pub fn detect_build_tag() -> &'static str {
    if cfg!(all(target_os = "windows", target_arch = "x86_64")) {
        "win-x64"
    } else if cfg!(target_os = "windows") {
        "win-x32"
    } else if cfg!(target_os = "freebsd") {
        "freebsd"
    } else if cfg!(target_os = "macos") {
        "mac-x64"
    } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
        "linux-armv8"
    } else if cfg!(all(target_os = "linux", target_arch = "arm")) {
        "linux-armv7"
    } else if cfg!(all(target_os = "linux", target_arch = "x86")) {
        "linux-x32"
    } else if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
        "linux-x64"
    } else {
        "source"
    }
}
