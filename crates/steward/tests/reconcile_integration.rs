//! End-to-end reconciliation scenarios against stub adapters and the
//! in-memory store and account directory.
//!
//! Key scenarios tested:
//! - Create, update, delete and idempotence of a single account's pass
//! - Failure kinds surfacing as per-reference errors without aborting
//! - Cross-account uniqueness, key collisions and repeated keys
//! - Dry runs, notifications and progress events
//! - Bulk runs, cancellation and the worker queue
//! - Account and fetch concurrency limits

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use steward::accounts::{Account, AccountDirectory, AccountError, MemoryAccounts};
use steward::registry::SourceRegistry;
use steward::service::SyncService;
use steward::source::{CanonicalRecord, RepositorySource, SourceError, SourceId};
use steward::store::{MemoryStore, PersistedRecord, RecordStore, StoreError};
use steward::sync::{
    AccountOutcome, ChangeAction, ChannelNotifier, ConcurrencyPolicy, ProgressCallback,
    ReferenceErrorKind, SyncEngine, SyncError, SyncOptions, SyncProgress, sync_all,
};

/// Maximum time any pass should take. Exceeding it means a hang.
const PASS_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Stubs ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Upstream {
    Record(CanonicalRecord),
    Unreachable,
    Garbled,
}

/// Adapter accepting every URL under `prefix`, answering from a table.
struct StubSource {
    id: SourceId,
    prefix: &'static str,
    upstream: Mutex<HashMap<String, Upstream>>,
}

impl StubSource {
    fn new(id: SourceId, prefix: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            prefix,
            upstream: Mutex::new(HashMap::new()),
        })
    }

    fn serve(&self, uri: &str, upstream: Upstream) {
        self.upstream
            .lock()
            .expect("stub lock")
            .insert(uri.to_string(), upstream);
    }

    fn remove(&self, uri: &str) {
        self.upstream.lock().expect("stub lock").remove(uri);
    }
}

#[async_trait]
impl RepositorySource for StubSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn validate(&self, uri: &str) -> bool {
        uri.starts_with(self.prefix)
    }

    fn help_text(&self) -> String {
        format!("{}<name>", self.prefix)
    }

    async fn fetch_record(&self, uri: &str) -> steward::source::Result<CanonicalRecord> {
        let upstream = self.upstream.lock().expect("stub lock").get(uri).cloned();
        match upstream {
            Some(Upstream::Record(record)) => Ok(record),
            Some(Upstream::Unreachable) => Err(SourceError::from_status(503, uri)),
            Some(Upstream::Garbled) => Err(SourceError::decode(uri, "expected a mapping")),
            None => Err(SourceError::not_found(uri)),
        }
    }
}

fn record(source: SourceId, key: &str, url: &str, open_issues: u32) -> CanonicalRecord {
    CanonicalRecord {
        key: key.to_string(),
        label: key.rsplit('/').next().unwrap_or(key).to_string(),
        description: None,
        open_issue_count: open_issues,
        source,
        url: url.to_string(),
    }
}

const YML: &str = "https://example.com/";
const FORGE: &str = "https://forge.test/";
const LAB: &str = "https://lab.test/";

struct Harness {
    yml: Arc<StubSource>,
    forge: Arc<StubSource>,
    lab: Arc<StubSource>,
    store: Arc<MemoryStore>,
    accounts: Arc<MemoryAccounts>,
}

impl Harness {
    fn new() -> Self {
        Self {
            yml: StubSource::new(SourceId::Yml, YML),
            forge: StubSource::new(SourceId::GitHub, FORGE),
            lab: StubSource::new(SourceId::GitLab, LAB),
            store: Arc::new(MemoryStore::new()),
            accounts: Arc::new(MemoryAccounts::new()),
        }
    }

    fn registry(&self) -> SourceRegistry {
        SourceRegistry::new(vec![
            self.forge.clone() as Arc<dyn RepositorySource>,
            self.lab.clone() as Arc<dyn RepositorySource>,
            self.yml.clone() as Arc<dyn RepositorySource>,
        ])
    }

    fn engine(&self) -> SyncEngine {
        SyncEngine::new(self.registry(), self.store.clone())
    }

    fn directory(&self) -> Arc<dyn AccountDirectory> {
        self.accounts.clone()
    }

    /// Serve an aquaman-style descriptor at `uri`.
    fn serve_descriptor(&self, uri: &str, key: &str, open_issues: u32) {
        self.yml.serve(
            uri,
            Upstream::Record(record(SourceId::Yml, key, uri, open_issues)),
        );
    }
}

async fn sync(engine: &SyncEngine, account: &Account) -> steward::sync::SyncResult {
    tokio::time::timeout(PASS_TIMEOUT, engine.sync_account(account))
        .await
        .expect("pass should not hang")
        .expect("pass should not abort")
}

// ─── Single Account ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_descriptor_reference_creates_record() {
    let h = Harness::new();
    h.yml.serve(
        "https://example.com/aquaman.yml",
        Upstream::Record(CanonicalRecord {
            key: "aquaman".into(),
            label: "Aquaman".into(),
            description: Some("Fish".into()),
            open_issue_count: 3,
            source: SourceId::Yml,
            url: "https://example.com/aquaman.yml".into(),
        }),
    );
    let account = h.accounts.add("arthur", &["https://example.com/aquaman.yml"]);

    let result = sync(&h.engine(), &account).await;

    assert_eq!(result.created, 1);
    assert_eq!(result.changes(), 1);
    assert!(!result.has_errors());
    let stored = h.store.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].owner_id, account.id);
    assert_eq!(stored[0].label, "Aquaman");
    assert_eq!(stored[0].content_hash, stored[0].to_canonical().content_hash());
}

#[tokio::test]
async fn test_missing_reference_is_not_found_without_mutations() {
    let h = Harness::new();
    let account = h.accounts.add("arthur", &["https://example.com/gone.yml"]);

    let result = sync(&h.engine(), &account).await;

    assert_eq!(result.changes(), 0);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ReferenceErrorKind::NotFound);
    assert_eq!(
        result.errors[0].message,
        "The repository at the url https://example.com/gone.yml was not found."
    );
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_transport_and_decode_failures_are_per_reference() {
    let h = Harness::new();
    h.forge.serve("https://forge.test/a/down", Upstream::Unreachable);
    h.yml.serve("https://example.com/bad.yml", Upstream::Garbled);
    h.serve_descriptor("https://example.com/good.yml", "good", 0);
    let account = h.accounts.add(
        "arthur",
        &[
            "https://forge.test/a/down",
            "https://example.com/bad.yml",
            "https://example.com/good.yml",
            "ftp://nowhere/repo",
        ],
    );

    let result = sync(&h.engine(), &account).await;

    assert_eq!(result.created, 1);
    assert_eq!(result.skipped, 3);
    let kinds: Vec<_> = result.errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ReferenceErrorKind::Transport,
            ReferenceErrorKind::Decode,
            ReferenceErrorKind::Validation,
        ]
    );
    assert_eq!(
        result.errors[2].message,
        "The repository url ftp://nowhere/repo is not valid."
    );
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 2);
    let account = h.accounts.add(
        "arthur",
        &["https://example.com/a.yml", "https://example.com/b.yml"],
    );
    let engine = h.engine();

    let first = sync(&engine, &account).await;
    let before = h.store.all();
    let second = sync(&engine, &account).await;

    assert_eq!(first.created, 2);
    assert_eq!(second.changes(), 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(h.store.all(), before);
}

#[tokio::test]
async fn test_changed_field_updates_in_place() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 2);
    let account = h.accounts.add(
        "arthur",
        &["https://example.com/a.yml", "https://example.com/b.yml"],
    );
    let engine = h.engine();
    sync(&engine, &account).await;
    let original = h.store.all();

    h.serve_descriptor("https://example.com/a.yml", "a", 5);
    let result = sync(&engine, &account).await;

    assert_eq!(result.updated, 1);
    assert_eq!(result.unchanged, 1);
    assert_eq!(result.created + result.deleted, 0);
    let updated = h.store.all();
    assert_eq!(updated[0].id, original[0].id);
    assert_eq!(updated[0].open_issue_count, 5);
    assert_ne!(updated[0].content_hash, original[0].content_hash);
    assert_eq!(updated[1], original[1]);
}

#[tokio::test]
async fn test_removed_reference_is_deleted() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 2);
    let account = h.accounts.add(
        "arthur",
        &["https://example.com/a.yml", "https://example.com/b.yml"],
    );
    let engine = h.engine();
    sync(&engine, &account).await;

    h.accounts
        .set_references(account.id, &["https://example.com/a.yml"])
        .expect("account exists");
    let account = h
        .accounts
        .find_account(account.id)
        .await
        .expect("directory readable")
        .expect("account exists");
    let result = sync(&engine, &account).await;

    assert_eq!(result.deleted, 1);
    assert_eq!(result.unchanged, 1);
    let keys: Vec<_> = h.store.all().into_iter().map(|r| r.key).collect();
    assert_eq!(keys, vec!["a"]);
}

#[tokio::test]
async fn test_upstream_disappearing_deletes_record() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    let account = h.accounts.add("arthur", &["https://example.com/a.yml"]);
    let engine = h.engine();
    sync(&engine, &account).await;

    h.yml.remove("https://example.com/a.yml");
    let result = sync(&engine, &account).await;

    assert_eq!(result.deleted, 1);
    assert_eq!(result.errors[0].kind, ReferenceErrorKind::NotFound);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_records_of_other_accounts_are_untouched() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 1);
    let ada = h.accounts.add("ada", &["https://example.com/a.yml"]);
    let grace = h.accounts.add("grace", &["https://example.com/b.yml"]);
    let engine = h.engine();
    sync(&engine, &ada).await;
    sync(&engine, &grace).await;

    h.accounts.set_references(ada.id, &[]).expect("account exists");
    let ada = h.accounts.find_account(ada.id).await.unwrap().unwrap();
    let result = sync(&engine, &ada).await;

    assert_eq!(result.deleted, 1);
    let remaining = h.store.all();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].owner_id, grace.id);
}

// ─── Uniqueness and Collisions ─────────────────────────────────────────────────

#[tokio::test]
async fn test_url_owned_by_another_account_is_rejected() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/shared.yml", "shared", 0);
    let first = h.accounts.add("first", &["https://example.com/shared.yml"]);
    let second = h.accounts.add("second", &["https://example.com/shared.yml"]);
    let engine = h.engine();

    sync(&engine, &first).await;
    let result = sync(&engine, &second).await;

    assert_eq!(result.changes(), 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ReferenceErrorKind::UniquenessConflict);
    assert_eq!(
        result.errors[0].message,
        "The repository at https://example.com/shared.yml has been added by another user."
    );
    let stored = h.store.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].owner_id, first.id);
}

#[tokio::test]
async fn test_same_key_from_two_sources_keeps_the_first() {
    let h = Harness::new();
    h.forge.serve(
        "https://forge.test/octo/widgets",
        Upstream::Record(record(
            SourceId::GitHub,
            "octo/widgets",
            "https://forge.test/octo/widgets",
            1,
        )),
    );
    h.lab.serve(
        "https://lab.test/octo/widgets",
        Upstream::Record(record(
            SourceId::GitLab,
            "octo/widgets",
            "https://lab.test/octo/widgets",
            1,
        )),
    );
    let account = h.accounts.add(
        "arthur",
        &[
            "https://forge.test/octo/widgets",
            "https://lab.test/octo/widgets",
        ],
    );

    let result = sync(&h.engine(), &account).await;

    assert_eq!(result.created, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ReferenceErrorKind::KeyCollision);
    assert_eq!(result.errors[0].uri, "https://lab.test/octo/widgets");
    assert_eq!(h.store.all()[0].source, SourceId::GitHub);
}

#[tokio::test]
async fn test_repeated_key_from_one_source_last_write_wins() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/one.yml", "dup", 1);
    h.serve_descriptor("https://example.com/two.yml", "dup", 2);
    let account = h.accounts.add(
        "arthur",
        &[
            "https://example.com/one.yml",
            "https://example.com/two.yml",
            "https://example.com/one.yml",
        ],
    );

    let result = sync(&h.engine(), &account).await;

    assert_eq!(result.created, 1);
    assert_eq!(result.skipped, 1);
    assert!(!result.has_errors());
    let stored = h.store.all();
    assert_eq!(stored[0].url, "https://example.com/two.yml");
    assert_eq!(stored[0].open_issue_count, 2);
}

// ─── Store Failures ────────────────────────────────────────────────────────────

/// Memory store whose reads or creates can be made to fail.
struct FaultyStore {
    inner: MemoryStore,
    fail_reads: bool,
    conflict_on_create: bool,
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn find(
        &self,
        owner_id: i64,
        key: &str,
        source: SourceId,
    ) -> steward::store::Result<Option<PersistedRecord>> {
        if self.fail_reads {
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.inner.find(owner_id, key, source).await
    }

    async fn find_by_url(&self, url: &str) -> steward::store::Result<Vec<PersistedRecord>> {
        self.inner.find_by_url(url).await
    }

    async fn create(&self, record: &PersistedRecord) -> steward::store::Result<PersistedRecord> {
        if self.conflict_on_create {
            return Err(StoreError::Conflict {
                url: record.url.clone(),
            });
        }
        self.inner.create(record).await
    }

    async fn update(&self, record: &PersistedRecord) -> steward::store::Result<PersistedRecord> {
        self.inner.update(record).await
    }

    async fn delete(&self, record: &PersistedRecord) -> steward::store::Result<()> {
        self.inner.delete(record).await
    }

    async fn list_by_owner(&self, owner_id: i64) -> steward::store::Result<Vec<PersistedRecord>> {
        self.inner.list_by_owner(owner_id).await
    }
}

#[tokio::test]
async fn test_store_read_failure_aborts_without_writes() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    let account = h.accounts.add("arthur", &["https://example.com/a.yml"]);
    let store = Arc::new(FaultyStore {
        inner: MemoryStore::new(),
        fail_reads: true,
        conflict_on_create: false,
    });
    let engine = SyncEngine::new(h.registry(), store.clone());

    let err = engine
        .sync_account(&account)
        .await
        .expect_err("store read failure aborts the pass");

    assert!(matches!(err, SyncError::Store(_)));
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn test_constraint_violation_reports_uniqueness() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    let account = h.accounts.add("arthur", &["https://example.com/a.yml"]);
    let store = Arc::new(FaultyStore {
        inner: MemoryStore::new(),
        fail_reads: false,
        conflict_on_create: true,
    });
    let engine = SyncEngine::new(h.registry(), store.clone());

    let result = sync(&engine, &account).await;

    assert_eq!(result.created, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ReferenceErrorKind::UniquenessConflict);
}

// ─── Dry Run, Notifications and Progress ───────────────────────────────────────

#[tokio::test]
async fn test_dry_run_reports_without_writing_or_notifying() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    let existing = PersistedRecord::new(
        1,
        &record(SourceId::Yml, "old", "https://example.com/old.yml", 0),
    );
    let store = Arc::new(MemoryStore::with_records([existing.clone()]));
    let account = h.accounts.add("arthur", &["https://example.com/a.yml"]);
    let (notifier, mut events) = ChannelNotifier::channel();
    let engine = SyncEngine::new(h.registry(), store.clone())
        .with_notifier(Arc::new(notifier))
        .with_options(SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        });

    let result = sync(&engine, &account).await;

    assert!(result.dry_run);
    assert_eq!(result.created, 1);
    assert_eq!(result.deleted, 1);
    assert_eq!(store.all(), vec![existing]);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_notifications_follow_each_mutation() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 1);
    let account = h.accounts.add("arthur", &["https://example.com/a.yml"]);
    let (notifier, mut events) = ChannelNotifier::channel();
    let engine = h.engine().with_notifier(Arc::new(notifier));

    sync(&engine, &account).await;
    let created = events.try_recv().expect("create notified");
    assert_eq!(created.action, ChangeAction::Created);
    assert_eq!(
        created.to_string(),
        format!(
            "The repo named a has been created (https://example.com/a.yml). The repo node is owned by arthur ({}).",
            account.id
        )
    );

    h.accounts
        .set_references(account.id, &["https://example.com/b.yml"])
        .expect("account exists");
    let account = h.accounts.find_account(account.id).await.unwrap().unwrap();
    sync(&engine, &account).await;

    let actions: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| (e.action, e.key))
        .collect();
    assert_eq!(
        actions,
        vec![
            (ChangeAction::Deleted, "a".to_string()),
            (ChangeAction::Created, "b".to_string()),
        ]
    );
}

fn recorder() -> (Arc<ProgressCallback>, Arc<Mutex<Vec<SyncProgress>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback: Arc<ProgressCallback> = Arc::new(Box::new(move |event: SyncProgress| {
        sink.lock().expect("progress lock").push(event);
    }));
    (callback, events)
}

#[tokio::test]
async fn test_progress_reports_fetches_failures_and_changes() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    let account = h.accounts.add(
        "arthur",
        &["https://example.com/a.yml", "https://example.com/missing.yml"],
    );
    let (callback, events) = recorder();
    let engine = h.engine().with_progress(callback);

    sync(&engine, &account).await;

    let events = events.lock().expect("progress lock");
    assert!(events.iter().any(|e| matches!(
        e,
        SyncProgress::FetchingReferences { count: 2, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SyncProgress::ReferenceFetched { key, .. } if key == "a"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SyncProgress::ReferenceFailed { uri, .. } if uri == "https://example.com/missing.yml"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SyncProgress::RecordChanged { action: ChangeAction::Created, .. }
    )));
}

#[tokio::test]
async fn test_empty_registry_is_a_configuration_error() {
    let h = Harness::new();
    let account = h.accounts.add("arthur", &["https://example.com/a.yml"]);
    let engine = SyncEngine::new(SourceRegistry::default(), h.store.clone());

    let err = engine
        .sync_account(&account)
        .await
        .expect_err("no adapters enabled");

    assert_eq!(err.to_string(), "There are no enabled repository plugins.");
}

// ─── Bulk and Queue ────────────────────────────────────────────────────────────

/// Directory that fails to read references for one account.
struct FlakyDirectory {
    inner: Arc<MemoryAccounts>,
    broken: i64,
}

#[async_trait]
impl AccountDirectory for FlakyDirectory {
    async fn list_active_accounts(&self) -> steward::accounts::Result<Vec<Account>> {
        self.inner.list_active_accounts().await
    }

    async fn find_account(&self, id: i64) -> steward::accounts::Result<Option<Account>> {
        self.inner.find_account(id).await
    }

    async fn get_references(&self, account: &Account) -> steward::accounts::Result<Vec<String>> {
        if account.id == self.broken {
            return Err(AccountError::Backend("profile unreadable".into()));
        }
        self.inner.get_references(account).await
    }
}

#[tokio::test]
async fn test_bulk_continues_past_failed_account() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 1);
    let ada = h.accounts.add("ada", &["https://example.com/a.yml"]);
    let broken = h.accounts.add("broken", &[]);
    let grace = h.accounts.add("grace", &["https://example.com/b.yml"]);
    let directory: Arc<dyn AccountDirectory> = Arc::new(FlakyDirectory {
        inner: h.accounts.clone(),
        broken: broken.id,
    });
    let accounts = vec![ada.clone(), broken.clone(), grace.clone()];

    let bulk = sync_all(
        &h.engine(),
        &directory,
        &accounts,
        ConcurrencyPolicy::bounded(2),
        None,
    )
    .await;

    let ids: Vec<_> = bulk.reports.iter().map(|r| r.account_id).collect();
    assert_eq!(ids, vec![ada.id, broken.id, grace.id]);
    assert_eq!(bulk.synced(), 2);
    assert_eq!(bulk.failed(), 1);
    assert!(matches!(
        &bulk.reports[1].outcome,
        AccountOutcome::Failed(message) if message.contains("profile unreadable")
    ));
    assert_eq!(bulk.totals().created, 2);
}

#[tokio::test]
async fn test_bulk_cancellation_before_start() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    let ada = h.accounts.add("ada", &["https://example.com/a.yml"]);
    let grace = h.accounts.add("grace", &[]);
    let shutdown = Arc::new(AtomicBool::new(true));

    let bulk = sync_all(
        &h.engine(),
        &h.directory(),
        &[ada, grace],
        ConcurrencyPolicy::sequential(),
        Some(&shutdown),
    )
    .await;

    assert_eq!(bulk.cancelled(), 2);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_bulk_uses_current_profile_references() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    let stale = h.accounts.add("ada", &[]);
    h.accounts
        .set_references(stale.id, &["https://example.com/a.yml"])
        .expect("account exists");

    let bulk = sync_all(
        &h.engine(),
        &h.directory(),
        &[stale],
        ConcurrencyPolicy::default(),
        None,
    )
    .await;

    assert_eq!(bulk.totals().created, 1);
}

#[tokio::test]
async fn test_service_runs_all_active_accounts() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 1);
    h.accounts.add("ada", &["https://example.com/a.yml"]);
    let idle = h.accounts.add("idle", &["https://example.com/b.yml"]);
    h.accounts.set_active(idle.id, false).expect("account exists");
    let (callback, events) = recorder();

    let service = SyncService::builder()
        .registry(h.registry())
        .store(h.store.clone())
        .accounts(h.accounts.clone())
        .policy(ConcurrencyPolicy::sequential())
        .progress(callback)
        .build()
        .expect("service should build");

    let bulk = service.run_for_all().await.expect("bulk run");
    assert_eq!(bulk.reports.len(), 1);
    assert_eq!(bulk.synced(), 1);

    // Inactive accounts can still be reconciled explicitly.
    let result = service.run_for_account(idle.id).await.expect("single run");
    assert_eq!(result.created, 1);

    let events = events.lock().expect("progress lock");
    assert!(events.iter().any(|e| matches!(
        e,
        SyncProgress::SyncAccountsComplete { synced: 1, failed: 0, cancelled: 0 }
    )));
}

#[tokio::test]
async fn test_service_validates_references_for_forms() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/taken.yml", "taken", 0);
    h.serve_descriptor("https://example.com/free.yml", "free", 0);
    let owner = h.accounts.add("owner", &["https://example.com/taken.yml"]);
    let other = h.accounts.add("other", &[]);

    let service = SyncService::builder()
        .registry(h.registry())
        .store(h.store.clone())
        .accounts(h.accounts.clone())
        .build()
        .expect("service should build");
    service.run_for_account(owner.id).await.expect("owner synced");

    let uris = vec![
        "https://example.com/taken.yml".to_string(),
        "https://example.com/free.yml".to_string(),
        "https://example.com/missing.yml".to_string(),
        "not a url".to_string(),
    ];
    let messages = service
        .validate_references(other.id, &uris)
        .await
        .expect("validation runs");

    assert_eq!(
        messages,
        vec![
            "The repository at https://example.com/taken.yml has been added by another user.",
            "The repository at the url https://example.com/missing.yml was not found.",
            "The repository url not a url is not valid.",
        ]
    );
    assert!(
        service
            .validate_references(owner.id, &uris[..1])
            .await
            .expect("validation runs")
            .is_empty()
    );
    assert_eq!(
        service.help_text(),
        "https://forge.test/<name> https://lab.test/<name> https://example.com/<name>"
    );
}

#[tokio::test]
async fn test_queue_processes_enqueued_accounts() {
    let h = Harness::new();
    h.serve_descriptor("https://example.com/a.yml", "a", 1);
    h.serve_descriptor("https://example.com/b.yml", "b", 1);
    h.accounts.add("ada", &["https://example.com/a.yml"]);
    h.accounts.add("grace", &["https://example.com/b.yml"]);

    let service = SyncService::builder()
        .registry(h.registry())
        .store(h.store.clone())
        .accounts(h.accounts.clone())
        .build()
        .expect("service should build");

    let queue = service.queue(2);
    assert_eq!(queue.enqueue_all().await.expect("accounts listed"), 2);
    queue.enqueue(99).expect("queue open");
    let reports = tokio::time::timeout(PASS_TIMEOUT, queue.shutdown())
        .await
        .expect("queue should drain");

    let outcomes: Vec<_> = reports
        .iter()
        .map(|r| (r.account_id, matches!(r.outcome, AccountOutcome::Synced(_))))
        .collect();
    assert_eq!(outcomes, vec![(1, true), (2, true), (99, false)]);
    assert_eq!(h.store.len(), 2);
    assert!(!service.is_shutdown_requested());
    service.shutdown_flag().store(true, Ordering::SeqCst);
    assert!(service.is_shutdown_requested());
}

// ─── Concurrency Limits ────────────────────────────────────────────────────────

/// Adapter that holds every fetch open for `hold` and records the most
/// fetches it saw in flight at once.
struct GatedSource {
    hold: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedSource {
    fn new(hold: Duration) -> Arc<Self> {
        Arc::new(Self {
            hold,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositorySource for GatedSource {
    fn id(&self) -> SourceId {
        SourceId::GitHub
    }

    fn validate(&self, uri: &str) -> bool {
        uri.starts_with(FORGE)
    }

    fn help_text(&self) -> String {
        format!("{FORGE}<name>")
    }

    async fn fetch_record(&self, uri: &str) -> steward::source::Result<CanonicalRecord> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = uri.trim_start_matches(FORGE);
        Ok(record(SourceId::GitHub, key, uri, 0))
    }
}

fn gated_engine(h: &Harness, gated: &Arc<GatedSource>, fetch_concurrency: usize) -> SyncEngine {
    let registry = SourceRegistry::new(vec![gated.clone() as Arc<dyn RepositorySource>]);
    SyncEngine::new(registry, h.store.clone()).with_options(SyncOptions {
        fetch_concurrency,
        ..SyncOptions::default()
    })
}

#[tokio::test(start_paused = true)]
async fn test_fetches_within_account_respect_fetch_concurrency() {
    let h = Harness::new();
    let gated = GatedSource::new(Duration::from_millis(50));
    let references: Vec<String> = (0..6).map(|n| format!("{FORGE}team/repo-{n}")).collect();
    let references: Vec<&str> = references.iter().map(String::as_str).collect();
    let account = h.accounts.add("ada", &references);

    let result = sync(&gated_engine(&h, &gated, 2), &account).await;

    assert_eq!(result.created, 6);
    assert_eq!(gated.peak(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_bulk_accounts_respect_account_concurrency() {
    let h = Harness::new();
    let gated = GatedSource::new(Duration::from_millis(50));
    let accounts: Vec<Account> = (0..5)
        .map(|n| {
            let uri = format!("{FORGE}user-{n}/repo");
            h.accounts.add(&format!("user-{n}"), &[uri.as_str()])
        })
        .collect();

    let bulk = tokio::time::timeout(
        PASS_TIMEOUT,
        sync_all(
            &gated_engine(&h, &gated, 4),
            &h.directory(),
            &accounts,
            ConcurrencyPolicy::bounded(2),
            None,
        ),
    )
    .await
    .expect("bulk run should not hang");

    assert_eq!(bulk.synced(), 5);
    assert_eq!(bulk.totals().created, 5);
    assert_eq!(gated.peak(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_account_and_fetch_limits_compose() {
    let h = Harness::new();
    let gated = GatedSource::new(Duration::from_millis(50));
    let accounts: Vec<Account> = (0..3)
        .map(|n| {
            let references: Vec<String> =
                (0..4).map(|r| format!("{FORGE}user-{n}/repo-{r}")).collect();
            let references: Vec<&str> = references.iter().map(String::as_str).collect();
            h.accounts.add(&format!("user-{n}"), &references)
        })
        .collect();

    let bulk = tokio::time::timeout(
        PASS_TIMEOUT,
        sync_all(
            &gated_engine(&h, &gated, 3),
            &h.directory(),
            &accounts,
            ConcurrencyPolicy::bounded(2),
            None,
        ),
    )
    .await
    .expect("bulk run should not hang");

    assert_eq!(bulk.totals().created, 12);
    assert!(gated.peak() <= 2 * 3, "peak {} over 2 accounts x 3 fetches", gated.peak());
    assert!(gated.peak() > 3, "accounts should overlap, peak {}", gated.peak());
}
