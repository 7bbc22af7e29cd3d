//! Update verification driver
//!
//! One long-lived worker owns the state machine and walks it through the
//! trust pipeline: DNS quorum, version selection, key import, signature
//! quorum, download, hash check. All blocking work happens with the
//! status lock released; observers follow along on the event bus.
//!
//! Trust model: an update is accepted only when two independently
//! DNSSEC-validated domains announce the identical record set, at least
//! two allow-listed maintainers published valid reproducible-build
//! attestations carrying the announced hash, and the downloaded artifact
//! hashes to that value. One bad signature anywhere fails the run.

use crate::dns_resolver::{count_valid, find_quorum_index, DnsQueryResult, TxtResolver};
use crate::events::UpdateEvent;
use crate::gitian::{
    assert_file_name, assert_line_regex, attestation_urls, extract_assert_hash, extract_users,
};
use crate::gpg_engine::{PgpEngine, PgpEngineFactory};
use crate::http_fetcher::{DownloadHandle, Fetcher};
use crate::pubkeys::TrustedKey;
use crate::records::{select_version, VersionSelection};
use crate::sha256sum::{sha256_file, to_hex};
use crate::state::UpdateState;
use crate::status::{Status, MIN_VALID_GITIAN_SIGS};
use crate::tristate::TriState;
use crate::update_urls::{
    detect_build_tag, gitian_build_tag, short_platform, subchannel_for, UpdateUrlBuilder,
};
use crate::vercmp::vercmp;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// The four authoritative update-announcement domains. All have DNSSEC
/// enabled; quorum needs two of them to agree.
pub const DNS_URLS: [&str; 4] = [
    "updates.moneropulse.org",
    "updates.moneropulse.net",
    "updates.moneropulse.co",
    "updates.moneropulse.se",
];

/// Driver poll cadence.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Construction-time inputs of the driver.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub software: String,
    pub buildtag: String,
    pub current_version: String,
    pub dns_urls: Vec<String>,
    /// Allow-listed maintainer keys for the signature quorum.
    pub trusted_keys: Vec<TrustedKey>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            software: "monero".to_string(),
            buildtag: detect_build_tag().to_string(),
            current_version: String::new(),
            dns_urls: DNS_URLS.iter().map(|s| s.to_string()).collect(),
            trusted_keys: Vec::new(),
        }
    }
}

/// Injected transport and crypto services.
pub struct Collaborators {
    pub resolver: Arc<dyn TxtResolver>,
    pub fetcher: Arc<dyn Fetcher>,
    pub pgp: Arc<dyn PgpEngineFactory>,
    pub urls: Arc<dyn UpdateUrlBuilder>,
}

impl Collaborators {
    /// Real resolvers, HTTP client, gpg engine, download server URLs.
    pub fn production() -> Self {
        Self {
            resolver: Arc::new(crate::dns_resolver::HickoryTxtResolver::new()),
            fetcher: Arc::new(crate::http_fetcher::ReqwestFetcher::new()),
            pgp: Arc::new(crate::gpg_engine::GpgEngineFactory),
            urls: Arc::new(crate::update_urls::DownloadsUrlBuilder),
        }
    }
}

/// gpg engine plus the private directory it works in; owned by the
/// driver, created by the key-import stage, removed after verification.
struct EngineSlot {
    engine: Arc<dyn PgpEngine>,
    homedir: PathBuf,
}

/// The update verifier. Constructing one spawns the worker; it starts in
/// Init and waits for [`Updater::select`].
pub struct Updater {
    ctx: Arc<DriverCtx>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Updater {
    pub fn new(config: UpdaterConfig, collaborators: Collaborators) -> Self {
        let status = Arc::new(Status::new(
            &config.software,
            &config.buildtag,
            &config.current_version,
        ));

        let ctx = Arc::new(DriverCtx {
            status,
            resolver: collaborators.resolver,
            fetcher: collaborators.fetcher,
            pgp: collaborators.pgp,
            urls: collaborators.urls,
            dns_urls: config.dns_urls,
            trusted_keys: config.trusted_keys,
            download: Mutex::new(None),
        });

        let worker_ctx = Arc::clone(&ctx);
        let worker = tokio::spawn(async move { driver_loop(worker_ctx).await });

        ctx.set_state(UpdateState::Init);

        Self {
            ctx,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Shared status record; subscribe or snapshot from here.
    pub fn status(&self) -> Arc<Status> {
        Arc::clone(&self.ctx.status)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<UpdateEvent> {
        self.ctx.status.subscribe()
    }

    /// Choose which software to track. Valid only while initializing.
    pub fn select(&self, which: &str) {
        let mut guard = self.ctx.status.lock();
        if guard.state != UpdateState::Init {
            error!("select() outside Init ignored: {which}");
            return;
        }
        match which {
            "gui" => guard.software = "monero-gui".to_string(),
            "cli" => guard.software = "monero".to_string(),
            other => {
                error!("Invalid selection: {other}");
                return;
            }
        }
        guard.next_state = UpdateState::QueryDns;
    }

    /// Re-enter the download stage. Valid only after a failed download.
    pub fn retry_download(&self) {
        let mut guard = self.ctx.status.lock();
        if guard.state == UpdateState::DownloadFailed {
            guard.next_state = UpdateState::Download;
        }
    }

    /// Stop the worker and wait for it to exit. After this returns no
    /// further events are published; an in-flight download is canceled.
    pub async fn shutdown(&self) {
        self.ctx.status.lock().running = false;
        if let Some(handle) = self.ctx.download.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.cancel();
        }
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        // backstop for callers that skip shutdown(); the worker notices
        // running=false or is aborted outright
        self.ctx.status.lock().running = false;
        if let Some(handle) = self.ctx.download.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.cancel();
        }
        if let Some(worker) = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take() {
            worker.abort();
        }
    }
}

/// Everything the worker and stage operations share.
struct DriverCtx {
    status: Arc<Status>,
    resolver: Arc<dyn TxtResolver>,
    fetcher: Arc<dyn Fetcher>,
    pgp: Arc<dyn PgpEngineFactory>,
    urls: Arc<dyn UpdateUrlBuilder>,
    dns_urls: Vec<String>,
    trusted_keys: Vec<TrustedKey>,
    download: Mutex<Option<DownloadHandle>>,
}

impl DriverCtx {
    fn set_state(&self, state: UpdateState) {
        self.status.lock().next_state = state;
    }
}

async fn driver_loop(ctx: Arc<DriverCtx>) {
    let mut engine: Option<EngineSlot> = None;

    loop {
        if !ctx.status.lock().running {
            break;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
        change_state(&ctx, &mut engine).await;

        let state = ctx.status.state();
        match state {
            UpdateState::QueryDns => {
                let guard = ctx.status.lock();
                if !guard.dns_query_done {
                    continue;
                }
                let failed = guard.good_dns_records.is_empty();
                drop(guard);
                ctx.set_state(if failed {
                    UpdateState::DnsFailed
                } else {
                    UpdateState::CheckVersion
                });
            }
            UpdateState::CheckVersion => {
                let guard = ctx.status.lock();
                if !guard.version_check_done {
                    continue;
                }
                let version = guard.version.clone();
                let current = guard.current_version.clone();
                drop(guard);
                if version.is_empty() {
                    ctx.set_state(UpdateState::NoUpdateInfoFound);
                } else {
                    ctx.set_state(match vercmp(&version, &current) {
                        Ordering::Greater => UpdateState::ImportPubkeys,
                        Ordering::Less => UpdateState::BackInTime,
                        Ordering::Equal => UpdateState::UpToDate,
                    });
                }
            }
            UpdateState::ImportPubkeys => {
                let guard = ctx.status.lock();
                if !guard.pubkeys_import_done {
                    continue;
                }
                let success = guard.pubkeys_import_success;
                drop(guard);
                ctx.set_state(if success {
                    UpdateState::FetchGitianSigs
                } else {
                    UpdateState::PubkeyImportFailed
                });
            }
            UpdateState::VerifyGitianSignatures => {
                let guard = ctx.status.lock();
                if !guard.verify_sigs_done {
                    continue;
                }
                let success = guard.verify_sigs_success;
                let bad = guard.bad_gitian_signature_found;
                drop(guard);
                ctx.set_state(if success {
                    UpdateState::Download
                } else if bad {
                    UpdateState::BadGitianSigs
                } else {
                    UpdateState::NotEnoughGitianSigs
                });
            }
            UpdateState::Download => {
                let guard = ctx.status.lock();
                if !guard.download_done {
                    continue;
                }
                let success = guard.download_success;
                drop(guard);
                ctx.set_state(if success {
                    UpdateState::CheckHash
                } else {
                    UpdateState::DownloadFailed
                });
            }
            UpdateState::CheckHash => {
                let hash_valid = ctx.status.lock().hash_valid;
                match hash_valid {
                    TriState::True => ctx.set_state(UpdateState::ValidUpdate),
                    TriState::False => ctx.set_state(UpdateState::BadHash),
                    TriState::Unknown => {}
                }
            }
            _ => {}
        }
    }
}

/// Commit the pending transition and run the entry action of the new
/// state.
async fn change_state(ctx: &Arc<DriverCtx>, engine: &mut Option<EngineSlot>) {
    let committed = ctx.status.lock().commit_pending_state();
    let Some(state) = committed else {
        return;
    };

    match state {
        UpdateState::Init => {
            let mut guard = ctx.status.lock();
            guard.dns_query_done = false;
            guard.version_check_done = false;
            guard.set_dns_valid(TriState::Unknown);
            guard.set_hash_valid(TriState::Unknown);
            guard.set_valid_gitian_sigs(0);
            guard.set_min_valid_gitian_sigs(0);
            guard.bad_gitian_signature_found = false;
        }
        UpdateState::QueryDns => load_txt_records_from_dns(ctx).await,
        UpdateState::CheckVersion => process_version(ctx).await,
        UpdateState::ImportPubkeys => import_pubkeys(ctx, engine).await,
        UpdateState::FetchGitianSigs => {
            fetch_gitian_sigs(ctx, engine.as_ref()).await;
            cleanup_engine(engine);
        }
        UpdateState::Download => start_download(ctx),
        UpdateState::CheckHash => check_hash(ctx).await,
        _ => {}
    }
}

/// DNS quorum stage: parallel DNSSEC TXT queries, two domains must agree
/// on the identical record set.
async fn load_txt_records_from_dns(ctx: &Arc<DriverCtx>) {
    let urls = {
        let mut guard = ctx.status.lock();
        guard.dns_query_done = false;
        guard.set_dns_valid(TriState::Unknown);
        guard.good_dns_records.clear();
        guard.add_message(format!(
            "Looking up DNS TXT records for: {}",
            ctx.dns_urls.join(", ")
        ));
        ctx.dns_urls.clone()
    };

    // all queries in flight at once
    let mut tasks = Vec::with_capacity(urls.len());
    for url in urls.clone() {
        let resolver = Arc::clone(&ctx.resolver);
        tasks.push(tokio::spawn(async move { resolver.txt_query(&url).await }));
    }
    let mut results: Vec<DnsQueryResult> = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(task.await.unwrap_or_default());
    }

    let mut guard = ctx.status.lock();

    // diagnostic traversal only; start point must not influence selection
    let seed = UNIX_EPOCH.elapsed().map(|d| d.as_secs()).unwrap_or(0)
        ^ u64::from(std::process::id());
    let mut rng = StdRng::seed_from_u64(seed);
    let first_index = rng.gen_range(0..urls.len());
    let mut cur_index = first_index;
    loop {
        let url = &urls[cur_index];
        let result = &results[cur_index];
        if !result.available {
            guard.add_message(format!("DNSSEC not available for hostname: {url}, skipping."));
        } else if !result.valid {
            guard.add_message(format!(
                "DNSSEC validation failed for hostname: {url}, skipping."
            ));
        } else if result.records.is_empty() {
            guard.add_message(format!("No records for hostname: {url}, skipping."));
        }
        cur_index = (cur_index + 1) % urls.len();
        if cur_index == first_index {
            break;
        }
    }

    let num_valid = count_valid(&results);
    if num_valid < 2 {
        guard.add_message("WARNING: no two valid DNS TXT records were received");
        guard.set_dns_valid(TriState::False);
        guard.dns_query_done = true;
        return;
    }

    let Some(index) = find_quorum_index(&results) else {
        guard.add_message("WARNING: no two DNS TXT records matched");
        guard.set_dns_valid(TriState::False);
        guard.dns_query_done = true;
        return;
    };

    guard.add_message(format!(
        "Found {num_valid}/{} matching DNSSEC records",
        urls.len()
    ));
    guard.good_dns_records = results[index].records.clone();
    guard.set_dns_valid(TriState::True);
    guard.dns_query_done = true;
}

/// Version selection stage: pick the highest announced version for this
/// software and buildtag.
async fn process_version(ctx: &Arc<DriverCtx>) {
    let (software, buildtag, records) = {
        let mut guard = ctx.status.lock();
        guard.version_check_done = false;
        guard.set_version("");
        (
            guard.software.clone(),
            guard.buildtag.clone(),
            guard.good_dns_records.clone(),
        )
    };

    let (selection, messages) = select_version(&software, &buildtag, &records);

    let mut guard = ctx.status.lock();
    for message in messages {
        guard.add_message(message);
    }
    match selection {
        VersionSelection::Selected { version, hash } => {
            guard.expected_hash = hash;
            guard.set_version(&version);
        }
        VersionSelection::Ambiguous | VersionSelection::NoneFound => {}
    }
    guard.version_check_done = true;
}

/// Key-import stage: bring the allow-listed maintainer keys into a fresh
/// private keyring and mark each one trusted.
async fn import_pubkeys(ctx: &Arc<DriverCtx>, engine: &mut Option<EngineSlot>) {
    {
        let mut guard = ctx.status.lock();
        guard.pubkeys_import_done = false;
        guard.pubkeys_import_success = false;
    }

    let homedir = std::env::temp_dir().join(format!("update-keyring-{}", random_tag()));
    let created = match ctx.pgp.create(&homedir).await {
        Ok(engine) => engine,
        Err(e) => {
            warn!("gpg engine init failed: {e}");
            let mut guard = ctx.status.lock();
            guard.add_message("Failed to initialize GPG");
            guard.pubkeys_import_done = true;
            return;
        }
    };

    for key in &ctx.trusted_keys {
        let fingerprint = match created.import_key(&key.armored).await {
            Ok(fpr) => fpr,
            Err(e) => {
                let mut guard = ctx.status.lock();
                guard.add_message(format!("Failed to import key from {}: {e}", key.owner));
                guard.pubkeys_import_done = true;
                return;
            }
        };
        if let Err(e) = created.mark_key_good(&fingerprint).await {
            let mut guard = ctx.status.lock();
            guard.add_message(format!("Failed to set trust policy for {fingerprint}: {e}"));
            guard.pubkeys_import_done = true;
            return;
        }

        let mut guard = ctx.status.lock();
        guard.add_message(format!("Imported key {fingerprint} from {}", key.owner));
        guard
            .imported_fingerprints
            .insert(fingerprint, key.owner.clone());
    }

    *engine = Some(EngineSlot {
        engine: created,
        homedir,
    });

    let mut guard = ctx.status.lock();
    guard.pubkeys_import_done = true;
    guard.pubkeys_import_success = true;
}

/// Signature-quorum stage: discover builders on the attestation index,
/// verify each detached signature, and require two distinct allow-listed
/// keys asserting the announced hash.
async fn fetch_gitian_sigs(ctx: &Arc<DriverCtx>, engine: Option<&EngineSlot>) {
    let (software, buildtag, version, expected_hash, imported) = {
        let mut guard = ctx.status.lock();
        guard.verify_sigs_done = false;
        guard.verify_sigs_success = false;
        guard.bad_gitian_signature_found = false;
        guard.set_total_gitian_sigs(0);
        guard.set_processed_gitian_sigs(0);
        (
            guard.software.clone(),
            guard.buildtag.clone(),
            guard.version.clone(),
            guard.expected_hash.clone(),
            guard.imported_fingerprints.clone(),
        )
    };

    let Some(engine) = engine else {
        // key import never ran; fail the stage rather than hang
        let mut guard = ctx.status.lock();
        guard.add_message("No signature engine available");
        guard.verify_sigs_done = true;
        drop(guard);
        ctx.set_state(UpdateState::NoGitianSigs);
        return;
    };

    let platform = short_platform(&buildtag);
    let urls = attestation_urls(&version, platform);
    {
        let mut guard = ctx.status.lock();
        guard.add_message(format!("Fetching Gitian signatures from {}", urls.tree_url));
    }

    let listing = match ctx.fetcher.fetch_text(&urls.tree_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!("attestation listing fetch failed: {e}");
            let mut guard = ctx.status.lock();
            guard.add_message("Gitian signatures not found");
            guard.set_valid_gitian_sigs(0);
            guard.verify_sigs_done = true;
            drop(guard);
            ctx.set_state(UpdateState::NoGitianSigs);
            return;
        }
    };

    let subchannel = subchannel_for(&software, &buildtag);
    let artifact_url =
        ctx.urls
            .update_url(&software, subchannel, gitian_build_tag(&buildtag), &version);
    let artifact_filename = basename(&artifact_url).to_string();
    let line_regex = assert_line_regex(&artifact_filename);

    {
        let mut guard = ctx.status.lock();
        guard.set_valid_gitian_sigs(0);
        guard.set_min_valid_gitian_sigs(MIN_VALID_GITIAN_SIGS);
    }

    let users = extract_users(&listing, &urls.tree_path);
    if users.is_empty() {
        let mut guard = ctx.status.lock();
        guard.add_message("No Gitian signatures found");
        guard.verify_sigs_done = true;
        drop(guard);
        ctx.set_state(UpdateState::NoGitianSigs);
        return;
    }

    ctx.set_state(UpdateState::VerifyGitianSignatures);
    ctx.status.lock().set_total_gitian_sigs(users.len() as u32);

    let short_version = version.get(0..4).unwrap_or(&version).to_string();
    let assert_name = assert_file_name(&software, platform, &short_version);
    // sequential by design; one fingerprint counts once
    let mut seen: HashMap<String, String> = HashMap::new();

    for user in users {
        // counted first so valid <= processed holds at every instant
        {
            let mut guard = ctx.status.lock();
            let processed = guard.processed_gitian_sigs + 1;
            guard.set_processed_gitian_sigs(processed);
        }

        verify_one_user(
            ctx,
            engine.engine.as_ref(),
            &urls.blob_url,
            &user,
            &assert_name,
            &artifact_filename,
            &line_regex,
            &expected_hash,
            &imported,
            &mut seen,
        )
        .await;
    }

    let mut guard = ctx.status.lock();
    guard.verify_sigs_success = guard.valid_gitian_sigs >= MIN_VALID_GITIAN_SIGS
        && !guard.bad_gitian_signature_found;
    guard.verify_sigs_done = true;
}

#[allow(clippy::too_many_arguments)]
async fn verify_one_user(
    ctx: &Arc<DriverCtx>,
    engine: &dyn PgpEngine,
    blob_url: &str,
    user: &str,
    assert_name: &str,
    artifact_filename: &str,
    line_regex: &regex::Regex,
    expected_hash: &str,
    imported: &HashMap<String, String>,
    seen: &mut HashMap<String, String>,
) {
    let assert_url = format!("{blob_url}/{user}/{assert_name}");
    let sig_url = format!("{assert_url}.sig");

    let assert_contents = match ctx.fetcher.fetch_text(&assert_url).await {
        Ok(contents) => contents,
        Err(_) => {
            ctx.status
                .lock()
                .add_message(format!("Failed to fetch {assert_url}"));
            return;
        }
    };
    let sig_contents = match ctx.fetcher.fetch_bytes(&sig_url).await {
        Ok(bytes) => bytes,
        Err(_) => {
            ctx.status
                .lock()
                .add_message(format!("Failed to fetch {sig_url}"));
            return;
        }
    };

    let check = match engine
        .verify_detached(assert_contents.as_bytes(), &sig_contents)
        .await
    {
        Ok(check) => check,
        Err(e) => {
            warn!("signature verification errored for {user}: {e}");
            crate::gpg_engine::SignatureCheck {
                fingerprint: None,
                verdict: TriState::Unknown,
            }
        }
    };

    let fingerprint = check.fingerprint.unwrap_or_default();
    match check.verdict {
        TriState::True if seen.contains_key(&fingerprint) => {
            let previous = seen[&fingerprint].clone();
            ctx.status.lock().add_message(format!(
                "Duplicate Gitian signature from {user}, previously seen from {previous}, fingerprint {fingerprint}"
            ));
        }
        TriState::True if !imported.contains_key(&fingerprint) => {
            ctx.status.lock().add_message(format!(
                "Valid Gitian signature from {user}, but from key {fingerprint} which is not the one on record"
            ));
        }
        TriState::True => {
            match extract_assert_hash(&assert_contents, line_regex) {
                None => {
                    ctx.status.lock().add_message(format!(
                        "No hash found in Gitian assert file for {artifact_filename} from {user}"
                    ));
                }
                Some(hash) if hash != expected_hash => {
                    ctx.status.lock().add_message(format!(
                        "Gitian hash does not match expected hash for {artifact_filename} from {user}"
                    ));
                }
                Some(_) => {
                    let mut guard = ctx.status.lock();
                    guard.add_message(format!(
                        "Good Gitian signature with matching hash from {user}, fingerprint {fingerprint}"
                    ));
                    let valid = guard.valid_gitian_sigs + 1;
                    guard.set_valid_gitian_sigs(valid);
                    drop(guard);
                    seen.insert(fingerprint, user.to_string());
                }
            }
        }
        TriState::False => {
            let mut guard = ctx.status.lock();
            guard.add_message(format!("Bad Gitian signature from {user}"));
            guard.bad_gitian_signature_found = true;
        }
        TriState::Unknown => {
            ctx.status.lock().add_message(format!(
                "Inconclusive Gitian signature from {user}, fingerprint {fingerprint}"
            ));
        }
    }
}

/// Download stage: launch the asynchronous artifact transfer and return;
/// the result callback flips the done flag.
fn start_download(ctx: &Arc<DriverCtx>) {
    let mut guard = ctx.status.lock();

    let subchannel = subchannel_for(&guard.software, &guard.buildtag);
    let url = ctx
        .urls
        .update_url(&guard.software, subchannel, &guard.buildtag, &guard.version);
    let filename = basename(&url).to_string();
    let download_path = std::env::temp_dir().join(format!("{}-{filename}", random_tag()));

    guard.download_done = false;
    guard.download_success = false;
    guard.download_path = Some(download_path.clone());
    guard.add_message(format!(
        "Downloading {url} to {}",
        download_path.display()
    ));

    let status = Arc::clone(&ctx.status);
    let on_progress: crate::http_fetcher::ProgressFn = Box::new(move |received, total| {
        status.bus().publish(UpdateEvent::DownloadProgress { received, total });
    });

    let status = Arc::clone(&ctx.status);
    let on_result: crate::http_fetcher::ResultFn = Box::new(move |success| {
        let mut guard = status.lock();
        guard.add_message(format!(
            "Download finished: {}",
            if success { "success" } else { "failed" }
        ));
        guard.download_done = true;
        guard.download_success = success;
        guard.publish(UpdateEvent::DownloadFinished(success));
    });

    let handle = ctx
        .fetcher
        .download(&download_path, &url, on_progress, on_result);
    *ctx.download.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    guard.publish(UpdateEvent::DownloadStarted);
}

/// Hash-check stage: the downloaded bytes must hash to the announced
/// value exactly.
async fn check_hash(ctx: &Arc<DriverCtx>) {
    let path = {
        let mut guard = ctx.status.lock();
        guard.set_hash_valid(TriState::Unknown);
        guard.download_path.clone()
    };

    let Some(path) = path else {
        let mut guard = ctx.status.lock();
        guard.add_message("Error calculating file hash");
        guard.set_hash_valid(TriState::False);
        return;
    };

    let digest = sha256_file(&path).await;

    let mut guard = ctx.status.lock();
    let digest = match digest {
        Ok(digest) => digest,
        Err(e) => {
            warn!("hashing {} failed: {e}", path.display());
            guard.add_message("Error calculating file hash");
            guard.set_hash_valid(TriState::False);
            return;
        }
    };

    let file_hash = to_hex(&digest);
    if file_hash != guard.expected_hash {
        guard.add_message("Invalid file hash");
        guard.set_hash_valid(TriState::False);
        return;
    }

    guard.add_message(format!("Update verified, hash {file_hash}"));
    guard.publish(UpdateEvent::ValidUpdateReady(path));
    guard.set_hash_valid(TriState::True);
}

fn cleanup_engine(engine: &mut Option<EngineSlot>) {
    if let Some(slot) = engine.take() {
        if let Err(e) = std::fs::remove_dir_all(&slot.homedir) {
            warn!("failed to remove keyring dir {}: {e}", slot.homedir.display());
        }
    }
}

fn basename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn random_tag() -> String {
    use rand::distributions::Alphanumeric;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdaterConfig::default();
        assert_eq!(config.software, "monero");
        assert_eq!(config.dns_urls.len(), 4);
        assert!(config.current_version.is_empty());
    }

    #[test]
    fn test_basename() {
        assert_eq!(
            basename("https://downloads.getmonero.org/cli/monero-linux-x64-v0.18.1.tar.bz2"),
            "monero-linux-x64-v0.18.1.tar.bz2"
        );
        assert_eq!(basename("no-slashes"), "no-slashes");
    }

    #[test]
    fn test_random_tag_shape() {
        let tag = random_tag();
        assert_eq!(tag.len(), 16);
        assert!(tag.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(random_tag(), tag);
    }
}
