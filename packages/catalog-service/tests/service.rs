use std::{
	collections::BTreeMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU32, Ordering},
	},
};

use time::macros::datetime;
use uuid::Uuid;

use catalog_config::{Config, Reindex, Retry, ScoreFunction, Search, Service, Similarity};
use catalog_domain::{EntityType, IndexDocument, OrganizationRef, SearchableRecord};
use catalog_service::{
	AlertSink, BoxFuture, Error, IndexQuery, IndexStore, IndexWriteAlert, ReindexAction,
	ReindexOutcome, ReindexQueue, RecordProvider, SearchRequest, SearchService,
};
use catalog_storage::{IndexPage, MemoryIndex, MemoryRecords, WriteOutcome};

struct Harness {
	service: Arc<SearchService>,
	index: Arc<MemoryIndex>,
	records: Arc<MemoryRecords>,
}
impl Harness {
	fn new() -> Self {
		let cfg = test_config();
		let index = Arc::new(MemoryIndex::from_config(&cfg.search));
		let records = Arc::new(MemoryRecords::new());
		let service = SearchService::new(
			cfg,
			Arc::clone(&index) as Arc<dyn IndexStore>,
			Arc::clone(&records) as Arc<dyn RecordProvider>,
		)
		.expect("Failed to build search service.");

		Self { service: Arc::new(service), index, records }
	}

	async fn save(&self, record: SearchableRecord) -> SearchableRecord {
		let (before, after) = self.records.put(record).expect("Failed to store record.");

		self.service.on_change(before.as_ref(), Some(&after)).await;

		after
	}

	async fn search(&self, request: SearchRequest) -> Vec<Uuid> {
		self.service
			.try_search(EntityType::Dataservice, &request)
			.await
			.expect("Search failed.")
			.hits
			.into_iter()
			.map(|hit| hit.id)
			.collect()
	}
}

struct FailingIndex {
	calls: AtomicU32,
}
impl FailingIndex {
	fn unavailable() -> catalog_storage::Error {
		catalog_storage::Error::Unavailable("connection refused.".to_string())
	}
}

impl IndexStore for FailingIndex {
	fn upsert<'a>(
		&'a self,
		_document: IndexDocument,
	) -> BoxFuture<'a, catalog_storage::Result<WriteOutcome>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Err(Self::unavailable()) })
	}

	fn delete<'a>(
		&'a self,
		_entity_type: EntityType,
		_id: Uuid,
		_version: u64,
	) -> BoxFuture<'a, catalog_storage::Result<WriteOutcome>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Err(Self::unavailable()) })
	}

	fn query<'a>(
		&'a self,
		_request: IndexQuery<'a>,
	) -> BoxFuture<'a, catalog_storage::Result<IndexPage>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Err(Self::unavailable()) })
	}
}

#[derive(Default)]
struct RecordingAlerts {
	alerts: Mutex<Vec<IndexWriteAlert>>,
}

impl AlertSink for RecordingAlerts {
	fn index_write_failed(&self, alert: &IndexWriteAlert) {
		self.alerts.lock().expect("Alert lock poisoned.").push(alert.clone());
	}
}

fn retry(max_attempts: u32) -> Retry {
	Retry { max_attempts, base_backoff_ms: 1, max_backoff_ms: 2 }
}

fn function(field: &str, factor: f64) -> ScoreFunction {
	ScoreFunction {
		field: field.to_string(),
		factor,
		modifier: "sqrt".to_string(),
		missing: 1.0,
	}
}

fn test_config() -> Config {
	let mut score_functions = BTreeMap::new();

	score_functions.insert(
		"dataservice".to_string(),
		vec![
			function("public_service_score", 8.0),
			function("metrics.followers", 4.0),
			function("metrics.views", 1.0),
		],
	);

	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			bind_localhost_only: true,
		},
		search: Search {
			default_page_size: 20,
			max_page_size: 100,
			timeout_ms: 1_000,
			synonyms: catalog_config::default_synonyms(),
			retry: retry(3),
			similarity: Similarity::default(),
			score_functions,
		},
		reindex: Reindex { mode: "sync".to_string(), queue_capacity: 16, retry: retry(2) },
	}
}

fn dataservice(title: &str, followers: Option<f64>) -> SearchableRecord {
	let mut record = SearchableRecord::new(
		Uuid::new_v4(),
		EntityType::Dataservice,
		title,
		datetime!(2024-03-01 10:00 UTC),
	);

	if let Some(followers) = followers {
		record.metrics.insert("followers".to_string(), followers);
	}

	record
}

#[tokio::test]
async fn amdac_query_ranks_matches_by_relevance_and_followers() {
	let harness = Harness::new();
	let a = harness.save(dataservice("A - Hello AMD world!", None)).await;
	let mut b = harness.save(dataservice("B - Other one", Some(1_337.0))).await;
	let c = harness.save(dataservice("C - AMD", Some(41.0))).await;

	assert_eq!(harness.search(SearchRequest::text("AMDAC")).await, vec![c.id, a.id]);

	b.title = "B - Hello AMD world!".to_string();

	let b = harness.save(b).await;

	assert_eq!(harness.search(SearchRequest::text("AMDAC")).await, vec![b.id, c.id, a.id]);
}

#[tokio::test]
async fn public_service_organization_wins_equal_text_relevance() {
	let harness = Harness::new();
	let plain = harness.save(dataservice("API Sirene", None)).await;
	let mut trusted = dataservice("API Sirene", None);

	trusted.organization = Some(OrganizationRef { id: Uuid::new_v4(), public_service: true });

	let trusted = harness.save(trusted).await;

	assert_eq!(harness.search(SearchRequest::text("api sirene")).await, vec![trusted.id, plain.id]);
}

#[tokio::test]
async fn private_toggle_hides_and_restores_record() {
	let harness = Harness::new();
	let mut record = harness.save(dataservice("Base adresse nationale", None)).await;

	assert_eq!(
		harness.search(SearchRequest::text("Base adresse nationale")).await,
		vec![record.id]
	);

	record.private = true;
	record = harness.save(record).await;

	assert!(harness.search(SearchRequest::text("Base adresse nationale")).await.is_empty());

	record.private = false;
	record = harness.save(record).await;

	assert_eq!(
		harness.search(SearchRequest::text("Base adresse nationale")).await,
		vec![record.id]
	);
	assert_eq!(record.revision, 3);
}

#[tokio::test]
async fn malformed_dataset_filter_is_invalid_query() {
	let harness = Harness::new();
	let request = SearchRequest::text("api").with_filter("dataset", "not-a-dataset-id");

	assert!(matches!(
		harness.service.try_search(EntityType::Dataservice, &request).await,
		Err(Error::InvalidQuery { .. })
	));
	assert!(matches!(
		harness.service.search(EntityType::Dataservice, &request).await,
		Err(Error::InvalidQuery { .. })
	));
}

#[tokio::test]
async fn oversized_page_size_is_clamped() {
	let harness = Harness::new();
	let request = SearchRequest { page_size: Some(1_000), ..SearchRequest::default() };
	let page = harness
		.service
		.search(EntityType::Dataservice, &request)
		.await
		.expect("Search failed.");

	assert_eq!(page.page_size, 100);
	assert!(page.available);

	let zero = SearchRequest { page: Some(0), ..SearchRequest::default() };

	assert!(matches!(
		harness.service.search(EntityType::Dataservice, &zero).await,
		Err(Error::InvalidQuery { .. })
	));
}

#[tokio::test]
async fn empty_text_orders_by_popularity() {
	let harness = Harness::new();
	let low = harness.save(dataservice("Horaires des marées", Some(5.0))).await;
	let high = harness.save(dataservice("Prix des carburants", Some(500.0))).await;
	let mid = harness.save(dataservice("Qualité de l'air", Some(50.0))).await;
	let page = harness
		.service
		.search(EntityType::Dataservice, &SearchRequest::default())
		.await
		.expect("Search failed.");
	let ids: Vec<Uuid> = page.hits.iter().map(|hit| hit.id).collect();

	assert_eq!(ids, vec![high.id, mid.id, low.id]);
	assert_eq!(page.total, 3);
	assert_eq!(page.next_page, None);
	assert_eq!(page.previous_page, None);
}

#[tokio::test]
async fn unreachable_index_degrades_after_bounded_retries() {
	let index = Arc::new(FailingIndex { calls: AtomicU32::new(0) });
	let service = SearchService::new(
		test_config(),
		Arc::clone(&index) as Arc<dyn IndexStore>,
		Arc::new(MemoryRecords::new()),
	)
	.expect("Failed to build search service.");
	let request = SearchRequest::text("api");

	assert!(matches!(
		service.try_search(EntityType::Dataservice, &request).await,
		Err(Error::SearchUnavailable { .. })
	));
	assert_eq!(index.calls.load(Ordering::SeqCst), 3);

	let page =
		service.search(EntityType::Dataservice, &request).await.expect("Degraded search failed.");

	assert!(!page.available);
	assert!(page.hits.is_empty());
	assert_eq!(page.total, 0);
}

#[tokio::test]
async fn write_failures_are_alerted_not_raised() {
	let alerts = Arc::new(RecordingAlerts::default());
	let service = SearchService::new(
		test_config(),
		Arc::new(FailingIndex { calls: AtomicU32::new(0) }),
		Arc::new(MemoryRecords::new()),
	)
	.expect("Failed to build search service.")
	.with_alerts(Arc::clone(&alerts) as Arc<dyn AlertSink>);
	let record = dataservice("API Entreprise", None);
	let outcome = service.on_change(None, Some(&record)).await;

	assert!(matches!(
		outcome,
		ReindexOutcome::Failed { action: ReindexAction::Upsert, attempts: 2, .. }
	));

	let recorded = alerts.alerts.lock().expect("Alert lock poisoned.");

	assert_eq!(recorded.len(), 1);
	assert_eq!(recorded[0].id, record.id);
	assert_eq!(recorded[0].action, ReindexAction::Upsert);
}

#[tokio::test]
async fn transition_table_drives_index_writes() {
	let harness = Harness::new();
	let service = &harness.service;
	let mut hidden = dataservice("Registre hidden", None);

	hidden.private = true;
	hidden.revision = 1;

	assert_eq!(service.on_change(None, None).await, ReindexOutcome::Noop);
	assert_eq!(service.on_change(None, Some(&hidden)).await, ReindexOutcome::Noop);
	assert_eq!(service.on_change(Some(&hidden), Some(&hidden)).await, ReindexOutcome::Noop);

	let mut visible = hidden.clone();

	visible.private = false;
	visible.revision = 2;

	assert_eq!(
		service.on_change(Some(&hidden), Some(&visible)).await,
		ReindexOutcome::Applied { action: ReindexAction::Upsert, version: 2 }
	);
	assert_eq!(
		service.on_change(Some(&visible), Some(&visible)).await,
		ReindexOutcome::Applied { action: ReindexAction::Upsert, version: 2 }
	);
	assert_eq!(harness.search(SearchRequest::text("registre")).await, vec![visible.id]);

	let mut archived = visible.clone();

	archived.archived_at = Some(datetime!(2024-06-01 00:00 UTC));
	archived.revision = 3;

	assert_eq!(
		service.on_change(Some(&visible), Some(&archived)).await,
		ReindexOutcome::Applied { action: ReindexAction::Delete, version: 3 }
	);
	assert!(harness.search(SearchRequest::text("registre")).await.is_empty());

	// A late replay of the visible revision must not resurrect the document.
	assert_eq!(
		service.on_change(Some(&hidden), Some(&visible)).await,
		ReindexOutcome::Stale { action: ReindexAction::Upsert, version: 2 }
	);
	assert!(harness.search(SearchRequest::text("registre")).await.is_empty());
}

#[tokio::test]
async fn hard_delete_removes_document() {
	let harness = Harness::new();
	let dataset = Uuid::new_v4();
	let mut record = dataservice("API Géo", None);

	record.datasets.push(dataset);

	let record = harness.save(record).await;
	let by_dataset = SearchRequest::default().with_filter("dataset", dataset.to_string());

	assert_eq!(harness.search(by_dataset.clone()).await, vec![record.id]);

	let removed = harness
		.records
		.remove(EntityType::Dataservice, record.id)
		.expect("Failed to remove record.")
		.expect("Record must exist.");
	let outcome = harness.service.on_change(Some(&removed), None).await;

	assert_eq!(outcome.action(), ReindexAction::Delete);
	assert!(harness.search(by_dataset).await.is_empty());
	assert!(
		harness.index.get(EntityType::Dataservice, record.id).expect("Index read failed.").is_none()
	);
}

#[tokio::test]
async fn replayed_delete_transitions_leave_the_index_unchanged() {
	let harness = Harness::new();
	let service = &harness.service;
	let visible = harness.save(dataservice("Balance comptable", None)).await;
	let kept = harness.save(dataservice("Balance commerciale", None)).await;
	let mut archived = visible.clone();

	archived.archived_at = Some(datetime!(2024-06-01 00:00 UTC));

	let (_, archived) = harness.records.put(archived).expect("Failed to store record.");

	assert_eq!(
		service.on_change(Some(&visible), Some(&archived)).await,
		ReindexOutcome::Applied { action: ReindexAction::Delete, version: 2 }
	);

	let settled = harness.index.live_ids(EntityType::Dataservice).expect("Index read failed.");

	assert_eq!(service.on_change(Some(&visible), Some(&archived)).await, ReindexOutcome::Noop);
	assert_eq!(
		harness.index.live_ids(EntityType::Dataservice).expect("Index read failed."),
		settled
	);

	let removed = harness
		.records
		.remove(EntityType::Dataservice, kept.id)
		.expect("Failed to remove record.")
		.expect("Record must exist.");

	assert_eq!(
		service.on_change(Some(&removed), None).await,
		ReindexOutcome::Applied { action: ReindexAction::Delete, version: 2 }
	);
	assert_eq!(service.on_change(Some(&removed), None).await, ReindexOutcome::Noop);
	assert!(
		harness.index.live_ids(EntityType::Dataservice).expect("Index read failed.").is_empty()
	);
	assert!(harness.search(SearchRequest::text("balance")).await.is_empty());
}

#[tokio::test]
async fn record_recreated_after_hard_delete_is_searchable() {
	let harness = Harness::new();
	let record = harness.save(dataservice("Annuaire de l'éducation", None)).await;
	let record = harness.save(record).await;
	let removed = harness
		.records
		.remove(EntityType::Dataservice, record.id)
		.expect("Failed to remove record.")
		.expect("Record must exist.");

	assert_eq!(
		harness.service.on_change(Some(&removed), None).await,
		ReindexOutcome::Applied { action: ReindexAction::Delete, version: 3 }
	);
	assert!(harness.search(SearchRequest::text("annuaire")).await.is_empty());

	let (before, recreated) = harness.records.put(record).expect("Failed to store record.");

	assert!(before.is_none());
	assert_eq!(recreated.revision, 4);
	assert_eq!(
		harness.service.on_change(None, Some(&recreated)).await,
		ReindexOutcome::Applied { action: ReindexAction::Upsert, version: 4 }
	);
	assert_eq!(harness.search(SearchRequest::text("annuaire")).await, vec![recreated.id]);

	let report = harness
		.service
		.rebuild_index(EntityType::Dataservice)
		.await
		.expect("Rebuild failed.");

	assert_eq!(report.indexed_count, 1);
	assert_eq!(report.skipped_count, 0);
}

#[tokio::test]
async fn single_record_reindex_reports_missing_and_failed_writes() {
	let harness = Harness::new();

	assert!(matches!(
		harness.service.reindex_record(EntityType::Dataservice, Uuid::new_v4()).await,
		Err(Error::NotFound { .. })
	));

	let (_, stored) = harness
		.records
		.put(dataservice("Jeux olympiques", None))
		.expect("Failed to store record.");

	assert!(harness.search(SearchRequest::text("olympiques")).await.is_empty());
	assert_eq!(
		harness
			.service
			.reindex_record(EntityType::Dataservice, stored.id)
			.await
			.expect("Reindex failed."),
		ReindexOutcome::Applied { action: ReindexAction::Upsert, version: 1 }
	);
	assert_eq!(harness.search(SearchRequest::text("olympiques")).await, vec![stored.id]);

	let records = Arc::new(MemoryRecords::new());
	let alerts = Arc::new(RecordingAlerts::default());
	let service = SearchService::new(
		test_config(),
		Arc::new(FailingIndex { calls: AtomicU32::new(0) }),
		Arc::clone(&records) as Arc<dyn RecordProvider>,
	)
	.expect("Failed to build search service.")
	.with_alerts(Arc::clone(&alerts) as Arc<dyn AlertSink>);
	let (_, stored) = records.put(stored).expect("Failed to store record.");

	assert!(matches!(
		service.reindex_record(EntityType::Dataservice, stored.id).await,
		Err(Error::IndexWriteFailed { .. })
	));
	assert_eq!(alerts.alerts.lock().expect("Alert lock poisoned.").len(), 1);
}

#[tokio::test]
async fn queued_reindex_applies_changes_in_order() {
	let harness = Harness::new();
	let (queue, worker) = ReindexQueue::spawn(Arc::clone(&harness.service));
	let mut record = dataservice("Transports en commun", None);

	for title in ["Transports en commun", "Horaires théoriques", "Horaires temps réel"] {
		record.title = title.to_string();

		let (before, after) = harness.records.put(record.clone()).expect("Failed to store record.");

		assert!(queue.submit(before, Some(after.clone())).await.is_none());

		record = after;
	}

	drop(queue);

	assert_eq!(worker.await.expect("Worker panicked."), 3);

	let document = harness
		.index
		.get(EntityType::Dataservice, record.id)
		.expect("Index read failed.")
		.expect("Document must be indexed.");

	assert_eq!(document.version, 3);
	assert_eq!(harness.search(SearchRequest::text("temps réel")).await, vec![record.id]);
	assert!(harness.search(SearchRequest::text("transports")).await.is_empty());
}

#[tokio::test]
async fn rebuild_reconciles_index_with_records() {
	let harness = Harness::new();
	let visible = harness.save(dataservice("Cadastre", Some(3.0))).await;
	let mut hidden = harness.save(dataservice("Cadastre privé", None)).await;

	// Stored without reindexing, leaving a stale visible document behind.
	hidden.private = true;

	let (_, hidden) = harness.records.put(hidden).expect("Failed to store record.");
	let unindexed = dataservice("Cadastre solaire", None);
	let (_, unindexed) = harness.records.put(unindexed).expect("Failed to store record.");
	let mut never_indexed = dataservice("Cadastre brouillon", None);

	never_indexed.private = true;

	harness.records.put(never_indexed).expect("Failed to store record.");

	assert_eq!(harness.search(SearchRequest::text("cadastre")).await.len(), 2);

	let report = harness
		.service
		.rebuild_index(EntityType::Dataservice)
		.await
		.expect("Rebuild failed.");

	assert_eq!(report.scanned_count, 4);
	assert_eq!(report.indexed_count, 2);
	assert_eq!(report.removed_count, 1);
	assert_eq!(report.skipped_count, 1);
	assert_eq!(report.error_count, 0);

	let mut found = harness.search(SearchRequest::text("cadastre")).await;
	let mut expected = vec![visible.id, unindexed.id];

	found.sort();
	expected.sort();

	assert_eq!(found, expected);
	assert!(
		harness.index.get(EntityType::Dataservice, hidden.id).expect("Index read failed.").is_none()
	);
}
