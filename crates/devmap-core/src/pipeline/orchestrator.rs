//! Batch orchestrator: fan-out per provider, fan-in, merge, append.
//!
//! Each batch moves through the same phases:
//!
//! ```text
//! dispatch primary → collect primary → dispatch secondary → collect secondary
//!     → merge → write → pause → next batch
//! ```
//!
//! Calls within one provider's phase run concurrently, one task per label,
//! in a task set owned by that phase. The phase ends only when every task
//! has finished, so the two providers never overlap and batches never
//! overlap. A failed call is logged and contributes no records.

use crate::config::{BatchConfig, Config};
use crate::error::ProviderError;
use crate::llm::{load_template, InferenceClient, LlmProviderFactory};
use crate::output::RecordWriter;
use crate::reconcile::SecondaryIndex;
use crate::types::{InferenceRecord, MergedRecord, RunStats};
use std::io::Write;
use std::time::Duration;
use tokio::task::JoinSet;

/// Batch scheduling options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Labels per batch, and the number of concurrent calls per provider
    pub batch_size: usize,
    /// Pause between the end of one batch and the start of the next
    pub pause: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.size,
            pause: Duration::from_millis(config.pause_ms),
        }
    }
}

/// Result of one provider call for one label.
#[derive(Debug)]
pub enum CallOutcome {
    Success {
        label: String,
        records: Vec<InferenceRecord>,
    },
    Failure {
        label: String,
        error: ProviderError,
    },
}

/// Progress events reported while a run is in flight.
#[derive(Debug)]
pub enum Progress<'a> {
    /// A batch is about to be dispatched (`index` is 1-based)
    BatchStarted {
        index: usize,
        total: usize,
        labels: &'a [String],
    },
    /// A merged row was written and flushed
    RecordWritten {
        record: &'a MergedRecord,
        rows_written: usize,
    },
    /// A batch has been written; `labels_done` counts all labels so far
    BatchFinished { index: usize, labels_done: usize },
}

/// Everything one provider produced for one batch.
#[derive(Debug, Default)]
struct Collected {
    records: Vec<InferenceRecord>,
    failures: usize,
}

/// Drives the two providers over all labels, batch by batch.
pub struct BatchOrchestrator {
    primary: InferenceClient,
    secondary: InferenceClient,
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(
        primary: InferenceClient,
        secondary: InferenceClient,
        options: BatchOptions,
    ) -> Self {
        Self {
            primary,
            secondary,
            options,
        }
    }

    /// Build both providers, the template and batch options from `config`.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let template = load_template(config.template_path().as_deref())?;
        let primary = LlmProviderFactory::create("primary", &config.providers.primary)?;
        let secondary = LlmProviderFactory::create("secondary", &config.providers.secondary)?;
        tracing::debug!(
            "Providers ready: primary={}, secondary={}",
            primary.name(),
            secondary.name()
        );
        Ok(Self::new(
            InferenceClient::new(primary, &template),
            InferenceClient::new(secondary, &template),
            BatchOptions::from(&config.batch),
        ))
    }

    /// Number of batches `label_count` labels are split into.
    pub fn batch_count(&self, label_count: usize) -> usize {
        label_count.div_ceil(self.batch_size())
    }

    fn batch_size(&self) -> usize {
        self.options.batch_size.max(1)
    }

    /// Process every label and append merged rows to `sink`.
    ///
    /// Provider failures never abort the run; only a failure to write the
    /// output does. Rows appear in the order the primary provider's answers
    /// arrived, not in input order.
    pub async fn run<W, F>(
        &self,
        labels: &[String],
        sink: &mut RecordWriter<W>,
        mut on_progress: F,
    ) -> crate::Result<RunStats>
    where
        W: Write,
        F: FnMut(Progress<'_>),
    {
        let total = self.batch_count(labels.len());
        let mut stats = RunStats {
            labels: labels.len(),
            ..RunStats::default()
        };
        let mut labels_done = 0usize;

        for (i, batch) in labels.chunks(self.batch_size()).enumerate() {
            let index = i + 1;
            tracing::info!("Processing batch {index}/{total}: {batch:?}");
            on_progress(Progress::BatchStarted {
                index,
                total,
                labels: batch,
            });

            let primary = collect(&self.primary, batch).await;
            let secondary = collect(&self.secondary, batch).await;
            stats.primary_records += primary.records.len();
            stats.primary_failures += primary.failures;
            stats.secondary_records += secondary.records.len();
            stats.secondary_failures += secondary.failures;

            let lookup = SecondaryIndex::build(&secondary.records);
            for record in primary.records {
                let merged = lookup.merge(record);
                sink.write(&merged)?;
                stats.rows_written += 1;
                tracing::info!("Wrote: {}", merged.label());
                on_progress(Progress::RecordWritten {
                    record: &merged,
                    rows_written: stats.rows_written,
                });
            }

            stats.batches += 1;
            labels_done += batch.len();
            on_progress(Progress::BatchFinished { index, labels_done });

            if index < total && !self.options.pause.is_zero() {
                tokio::time::sleep(self.options.pause).await;
            }
        }

        Ok(stats)
    }
}

/// Call `client` once per label concurrently and gather the answers as they land.
async fn collect(client: &InferenceClient, batch: &[String]) -> Collected {
    let mut tasks = JoinSet::new();
    for label in batch {
        let client = client.clone();
        let label = label.clone();
        tasks.spawn(async move { call_single(&client, label).await });
    }

    let mut collected = Collected::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(CallOutcome::Success { label, records }) => {
                for record in records.iter().filter(|r| r.origin_device_model != label) {
                    tracing::warn!(
                        "{} answered '{}' with a record for '{}'",
                        client.name(),
                        label,
                        record.origin_device_model
                    );
                }
                collected.records.extend(records);
            }
            Ok(CallOutcome::Failure { label, error }) => {
                tracing::error!("{} failed for {}: {}", client.name(), label, error);
                collected.failures += 1;
            }
            Err(e) => {
                tracing::error!("{} call task panicked: {e}", client.name());
                collected.failures += 1;
            }
        }
    }
    collected
}

async fn call_single(client: &InferenceClient, label: String) -> CallOutcome {
    match client.infer(std::slice::from_ref(&label)).await {
        Ok(records) => CallOutcome::Success { label, records },
        Err(error) => CallOutcome::Failure { label, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::error::MalformedResponse;
    use crate::input::read_labels;
    use crate::llm::{LlmProvider, LlmRequest, LlmResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Start,
        End,
    }

    /// Shared log of (provider, label, phase) in the order they happened.
    type EventLog = Arc<Mutex<Vec<(&'static str, String, Phase)>>>;

    type Script = Box<dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync>;

    /// Mock provider whose answer per label is scripted by the test.
    struct ScriptedProvider {
        name: &'static str,
        script: Script,
        events: EventLog,
        delay: Duration,
        in_flight: Arc<AtomicU32>,
        max_in_flight: Arc<AtomicU32>,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, events: &EventLog, script: Script) -> Self {
            Self {
                name,
                script,
                events: events.clone(),
                delay: Duration::from_millis(5),
                in_flight: Arc::new(AtomicU32::new(0)),
                max_in_flight: Arc::new(AtomicU32::new(0)),
            }
        }

        /// Answers every label with a fenced single-record array.
        fn answering(name: &'static str, brand: &'static str, events: &EventLog) -> Self {
            Self::new(name, events, Box::new(move |label| Ok(answer(label, brand))))
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
            let label = request.labels.join("\n");
            self.events
                .lock()
                .unwrap()
                .push((self.name, label.clone(), Phase::Start));
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            let result = (self.script)(&label);

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push((self.name, label, Phase::End));
            result.map(|text| LlmResponse {
                text,
                model: "mock-v1".to_string(),
                tokens_used: None,
                latency_ms: self.delay.as_millis() as u64,
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(120)
        }
    }

    fn answer(label: &str, brand: &str) -> String {
        format!(
            "Sure!\n```json\n[{{\"origin_device_model\": \"{label}\", \"mapped_brand\": \"{brand}\", \"cpu_core\": 8}}]\n```"
        )
    }

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("MODEL-{i:03}")).collect()
    }

    fn orchestrator(
        primary: ScriptedProvider,
        secondary: ScriptedProvider,
        batch_size: usize,
    ) -> BatchOrchestrator {
        BatchOrchestrator::new(
            InferenceClient::new(Box::new(primary), "TEMPLATE"),
            InferenceClient::new(Box::new(secondary), "TEMPLATE"),
            BatchOptions {
                batch_size,
                pause: Duration::ZERO,
            },
        )
    }

    fn parse_rows(bytes: Vec<u8>) -> Vec<HashMap<String, String>> {
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        reader.deserialize().map(|r| r.unwrap()).collect()
    }

    #[tokio::test]
    async fn test_seven_labels_two_batches_each_dispatched_once() {
        let events: EventLog = Arc::default();
        let orch = orchestrator(
            ScriptedProvider::answering("primary", "Huawei", &events),
            ScriptedProvider::answering("secondary", "HUAWEI", &events),
            5,
        );
        let labels = labels(7);
        assert_eq!(orch.batch_count(labels.len()), 2);

        let mut sink = RecordWriter::new(Vec::new(), true);
        let stats = orch.run(&labels, &mut sink, |_| {}).await.unwrap();

        assert_eq!(stats.batches, 2);
        assert_eq!(stats.labels, 7);
        assert_eq!(stats.rows_written, 7);
        assert_eq!(stats.primary_failures + stats.secondary_failures, 0);

        let events = events.lock().unwrap();
        for provider in ["primary", "secondary"] {
            for label in &labels {
                let starts = events
                    .iter()
                    .filter(|(p, l, ph)| *p == provider && l == label && *ph == Phase::Start)
                    .count();
                assert_eq!(starts, 1, "{provider} dispatched {label} {starts} times");
            }
        }

        let rows = parse_rows(sink.into_inner().unwrap());
        assert_eq!(rows.len(), 7);
        for row in &rows {
            assert_eq!(row["mapped_brand"], "Huawei");
            assert_eq!(row["secondary_mapped_brand"], "HUAWEI");
            assert_eq!(row["secondary_cpu_core"], "8");
        }
    }

    #[tokio::test]
    async fn test_primary_phase_finishes_before_secondary_starts() {
        let events: EventLog = Arc::default();
        let primary = ScriptedProvider::new(
            "primary",
            &events,
            Box::new(|label| Ok(answer(label, "p"))),
        )
        .with_delay(Duration::from_millis(20));
        let orch = orchestrator(
            primary,
            ScriptedProvider::answering("secondary", "s", &events),
            3,
        );
        let labels = labels(7);
        let mut sink = RecordWriter::new(Vec::new(), true);
        orch.run(&labels, &mut sink, |_| {}).await.unwrap();

        let events = events.lock().unwrap();
        let position = |provider: &str, batch: &[String], phase: Phase| -> Vec<usize> {
            events
                .iter()
                .enumerate()
                .filter(|(_, (p, l, ph))| *p == provider && batch.contains(l) && *ph == phase)
                .map(|(i, _)| i)
                .collect()
        };

        let batches: Vec<&[String]> = labels.chunks(3).collect();
        for (i, batch) in batches.iter().copied().enumerate() {
            let last_primary_end = *position("primary", batch, Phase::End).iter().max().unwrap();
            let first_secondary_start =
                *position("secondary", batch, Phase::Start).iter().min().unwrap();
            assert!(last_primary_end < first_secondary_start, "batch {i} interleaved");

            if let Some(next) = batches.get(i + 1).copied() {
                let last_secondary_end =
                    *position("secondary", batch, Phase::End).iter().max().unwrap();
                let next_primary_start =
                    *position("primary", next, Phase::Start).iter().min().unwrap();
                assert!(last_secondary_end < next_primary_start, "batch {i} overlapped next");
            }
        }
    }

    #[tokio::test]
    async fn test_calls_within_batch_run_concurrently_up_to_batch_size() {
        let events: EventLog = Arc::default();
        let primary = ScriptedProvider::answering("primary", "p", &events)
            .with_delay(Duration::from_millis(50));
        let max_in_flight = primary.max_in_flight.clone();
        let orch = orchestrator(
            primary,
            ScriptedProvider::answering("secondary", "s", &events),
            4,
        );

        let mut sink = RecordWriter::new(Vec::new(), false);
        orch.run(&labels(10), &mut sink, |_| {}).await.unwrap();

        let max = max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 4, "more than one batch in flight: {max}");
        assert!(max >= 2, "calls were not concurrent: {max}");
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_label() {
        let events: EventLog = Arc::default();
        let primary = ScriptedProvider::new(
            "primary",
            &events,
            Box::new(|label| match label {
                "MODEL-001" => Err(ProviderError::CallFailure {
                    provider: "primary".to_string(),
                    message: "HTTP 500".to_string(),
                    status_code: Some(500),
                }),
                "MODEL-002" => Ok("I am not sure what this device is.".to_string()),
                "MODEL-003" => Ok("[{\"origin_device_model\": \"MODEL-003\"".to_string()),
                other => Ok(answer(other, "p")),
            }),
        );
        let secondary = ScriptedProvider::new(
            "secondary",
            &events,
            Box::new(|label| match label {
                "MODEL-004" => Err(ProviderError::Timeout {
                    provider: "secondary".to_string(),
                    timeout_ms: 120_000,
                }),
                other => Ok(answer(other, "s")),
            }),
        );
        let orch = orchestrator(primary, secondary, 5);

        let mut sink = RecordWriter::new(Vec::new(), true);
        let stats = orch.run(&labels(6), &mut sink, |_| {}).await.unwrap();

        assert_eq!(stats.primary_failures, 3);
        assert_eq!(stats.secondary_failures, 1);
        assert_eq!(stats.primary_records, 3);
        assert_eq!(stats.secondary_records, 5);
        assert_eq!(stats.rows_written, 3);

        let rows = parse_rows(sink.into_inner().unwrap());
        let mut written: Vec<&str> = rows
            .iter()
            .map(|r| r["origin_device_model"].as_str())
            .collect();
        written.sort();
        // Labels answered only by the secondary provider produce no row
        assert_eq!(written, vec!["MODEL-000", "MODEL-004", "MODEL-005"]);

        let failed_secondary = rows
            .iter()
            .find(|r| r["origin_device_model"] == "MODEL-004")
            .unwrap();
        assert_eq!(failed_secondary["mapped_brand"], "p");
        assert_eq!(failed_secondary["secondary_mapped_brand"], "");
        assert_eq!(failed_secondary["secondary_cpu_core"], "");
    }

    #[tokio::test]
    async fn test_malformed_outcome_carries_label() {
        let events: EventLog = Arc::default();
        let provider = ScriptedProvider::new(
            "primary",
            &events,
            Box::new(|_| Ok("no array here".to_string())),
        );
        let client = InferenceClient::new(Box::new(provider), "TEMPLATE");
        match call_single(&client, "TAS-AN00".to_string()).await {
            CallOutcome::Failure { label, error } => {
                assert_eq!(label, "TAS-AN00");
                assert!(matches!(
                    error,
                    ProviderError::MalformedResponse(MalformedResponse::NoArrayStart)
                ));
            }
            CallOutcome::Success { .. } => panic!("expected malformed failure"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_input_labels_processed_independently() {
        let events: EventLog = Arc::default();
        let orch = orchestrator(
            ScriptedProvider::answering("primary", "p", &events),
            ScriptedProvider::answering("secondary", "s", &events),
            5,
        );
        let labels = vec!["TAS-AN00".to_string(), "TAS-AN00".to_string()];
        let mut sink = RecordWriter::new(Vec::new(), false);
        let stats = orch.run(&labels, &mut sink, |_| {}).await.unwrap();

        assert_eq!(stats.rows_written, 2);
        let primary_calls = events
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _, ph)| *p == "primary" && *ph == Phase::Start)
            .count();
        assert_eq!(primary_calls, 2);
    }

    #[tokio::test]
    async fn test_progress_reported_per_row_and_batch() {
        let events: EventLog = Arc::default();
        let orch = orchestrator(
            ScriptedProvider::answering("primary", "p", &events),
            ScriptedProvider::answering("secondary", "s", &events),
            2,
        );
        let mut written = Vec::new();
        let mut finished = Vec::new();
        let mut sink = RecordWriter::new(Vec::new(), false);
        orch.run(&labels(5), &mut sink, |event| match event {
            Progress::RecordWritten {
                record,
                rows_written,
            } => written.push((record.label().to_string(), rows_written)),
            Progress::BatchFinished { index, labels_done } => finished.push((index, labels_done)),
            Progress::BatchStarted { total, .. } => assert_eq!(total, 3),
        })
        .await
        .unwrap();

        assert_eq!(written.len(), 5);
        assert_eq!(written.last().unwrap().1, 5);
        assert_eq!(finished, vec![(1, 2), (2, 4), (3, 5)]);
    }

    #[tokio::test]
    async fn test_pause_between_batches() {
        let events: EventLog = Arc::default();
        let orch = BatchOrchestrator::new(
            InferenceClient::new(
                Box::new(ScriptedProvider::answering("primary", "p", &events)),
                "TEMPLATE",
            ),
            InferenceClient::new(
                Box::new(ScriptedProvider::answering("secondary", "s", &events)),
                "TEMPLATE",
            ),
            BatchOptions {
                batch_size: 2,
                pause: Duration::from_millis(60),
            },
        );
        let mut sink = RecordWriter::new(Vec::new(), false);
        let start = std::time::Instant::now();
        orch.run(&labels(6), &mut sink, |_| {}).await.unwrap();
        // Three batches, two pauses between them
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_empty_label_list_writes_nothing() {
        let events: EventLog = Arc::default();
        let orch = orchestrator(
            ScriptedProvider::answering("primary", "p", &events),
            ScriptedProvider::answering("secondary", "s", &events),
            5,
        );
        let mut sink = RecordWriter::new(Vec::new(), true);
        let stats = orch.run(&[], &mut sink, |_| {}).await.unwrap();
        assert_eq!(stats, RunStats::default());
        assert!(events.lock().unwrap().is_empty());
        assert!(sink.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_files_and_rerun_appends_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("devices.csv");
        let output = dir.path().join("cross_check.csv");
        std::fs::write(
            &input,
            "\u{FEFF}\"origin_device_model\",source\n\
             TAS-AN00,a\nSM-G9910,a\nV2049A,b\nPGT-AN10,b\nM2102K1C,c\n\
             LE2120,c\n\"iPhone14,2\",d\n1234,x\n12345678,x\n中文设备名,x\n,x\n",
        )
        .unwrap();

        let set = read_labels(&input, &InputConfig::default()).unwrap();
        assert_eq!(set.labels.len(), 7);
        assert_eq!(set.dropped_total(), 4);

        let events: EventLog = Arc::default();
        // Primary cannot answer one label; secondary answers everything
        let primary = ScriptedProvider::new(
            "primary",
            &events,
            Box::new(|label| {
                if label == "LE2120" {
                    Ok("unknown device".to_string())
                } else {
                    Ok(answer(label, "p"))
                }
            }),
        );
        let orch = orchestrator(
            primary,
            ScriptedProvider::answering("secondary", "s", &events),
            5,
        );

        let mut sink = RecordWriter::append_to(&output).unwrap();
        let first = orch.run(&set.labels, &mut sink, |_| {}).await.unwrap();
        drop(sink);
        assert_eq!(first.batches, 2);
        assert_eq!(first.rows_written, 6);

        let mut sink = RecordWriter::append_to(&output).unwrap();
        let second = orch.run(&set.labels, &mut sink, |_| {}).await.unwrap();
        drop(sink);
        assert_eq!(second.rows_written, 6);

        let content = std::fs::read(&output).unwrap();
        let rows = parse_rows(content.clone());
        assert_eq!(rows.len(), 12);
        let header_lines = String::from_utf8(content)
            .unwrap()
            .lines()
            .filter(|l| l.starts_with("origin_device_model,"))
            .count();
        assert_eq!(header_lines, 1);
        assert!(rows.iter().all(|r| r["origin_device_model"] != "LE2120"));
    }
}
