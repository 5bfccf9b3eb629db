//! Bounded batch generation ("generate all").
//!
//! Every team in the roster snapshot is attempted at least once. At most
//! `max_in_flight` teams are generating at any moment; a team keeps its slot
//! across its retries and backoff sleeps, so the cap bounds teams (and
//! `generating=true` flags), not attempts. One team's failure is recorded in
//! its outcome and never aborts the batch.
//!
//! There is no cancellation: once started, a batch runs until every team has
//! finished its final attempt, and a hung upstream call hangs its slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

use crate::error::AppError;

use super::generator::LogoGenerator;
use super::team::{Team, TeamRoster};

/// Concurrency and retry settings for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Teams allowed to generate simultaneously (at least 1).
    pub max_in_flight: usize,
    /// Attempts per team, including the first (at least 1).
    pub max_attempts: u32,
    /// Linear backoff unit: attempt `n` failing waits `n * retry_delay`.
    pub retry_delay: Duration,
    /// Pause after each team's final attempt before its slot is released.
    pub inter_entity_delay: Duration,
}

impl BatchPolicy {
    /// Two teams at a time, one attempt each; the next team starts as soon
    /// as any running one finishes.
    pub fn window() -> Self {
        Self {
            max_in_flight: 2,
            max_attempts: 1,
            retry_delay: Duration::ZERO,
            inter_entity_delay: Duration::ZERO,
        }
    }

    /// One team at a time, up to 3 attempts with linear backoff, and a pause
    /// between teams to go easy on the shared endpoint.
    pub fn sequential_with_retry() -> Self {
        Self {
            max_in_flight: 1,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            inter_entity_delay: Duration::from_millis(750),
        }
    }

    fn backoff(&self, failed_attempt: u32) -> Duration {
        self.retry_delay * failed_attempt
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::window()
    }
}

/// Progress snapshot delivered after each team completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Final state of one team after the batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOutcome {
    pub team_id: String,
    pub team_name: String,
    pub attempts: u32,
    #[serde(serialize_with = "serialize_result")]
    pub result: Result<String, AppError>,
}

impl TeamOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

fn serialize_result<S>(result: &Result<String, AppError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(1))?;
    match result {
        Ok(url) => map.serialize_entry("logoUrl", url)?,
        Err(e) => map.serialize_entry("failure", e)?,
    }
    map.end()
}

/// Outcomes in completion order, plus timing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub outcomes: Vec<TeamOutcome>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TeamOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

type ProgressFn = dyn Fn(BatchProgress) + Send + Sync;

/// Runs one generation per team under a [`BatchPolicy`].
pub struct BatchRunner<G: ?Sized> {
    generator: Arc<G>,
    policy: BatchPolicy,
}

impl<G: LogoGenerator + ?Sized + 'static> BatchRunner<G> {
    pub fn new(generator: Arc<G>, policy: BatchPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> &BatchPolicy {
        &self.policy
    }

    /// Generate a logo for every team currently in `roster`.
    ///
    /// `on_progress` sees `completed` strictly increase from 1 to `total`.
    pub async fn run<P>(&self, roster: &TeamRoster, on_progress: P) -> Result<BatchReport, AppError>
    where
        P: Fn(BatchProgress) + Send + Sync + 'static,
    {
        let started = Instant::now();
        let queue = roster.snapshot();
        let total = queue.len();
        let policy = BatchPolicy {
            max_in_flight: self.policy.max_in_flight.max(1),
            max_attempts: self.policy.max_attempts.max(1),
            ..self.policy
        };

        tracing::info!(
            total,
            max_in_flight = policy.max_in_flight,
            max_attempts = policy.max_attempts,
            "Batch generation started",
        );

        let slots = Arc::new(Semaphore::new(policy.max_in_flight));
        // Counter and callback share one lock so progress is reported in order.
        let progress: Arc<Mutex<(usize, Box<ProgressFn>)>> = Arc::new(Mutex::new((0, Box::new(on_progress))));
        let mut tasks = JoinSet::new();
        let mut spawned: HashMap<task::Id, (String, String)> = HashMap::with_capacity(total);

        for team in queue {
            let permit = slots
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(format!("batch slots closed: {e}")))?;

            let generator = self.generator.clone();
            let roster = roster.clone();
            let progress = progress.clone();
            let key = (team.id.clone(), team.name.clone());

            let handle = tasks.spawn(async move {
                let outcome = generate_with_retry(generator.as_ref(), &roster, team, &policy).await;
                report_progress(&progress, total);
                if !policy.inter_entity_delay.is_zero() {
                    tokio::time::sleep(policy.inter_entity_delay).await;
                }
                drop(permit);
                outcome
            });
            spawned.insert(handle.id(), key);
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, outcome)) => outcomes.push(outcome),
                Err(e) => {
                    // The busy flag was already cleared while the task unwound.
                    let Some((team_id, team_name)) = spawned.remove(&e.id()) else {
                        tracing::error!(error = %e, "Untracked batch task failed");
                        continue;
                    };
                    tracing::error!(team_id = %team_id, error = %e, "Generation task panicked for {}", team_name);
                    report_progress(&progress, total);
                    outcomes.push(TeamOutcome {
                        team_id,
                        team_name,
                        attempts: 1,
                        result: Err(AppError::Internal("generation task panicked".into())),
                    });
                }
            }
        }

        let report = BatchReport {
            total,
            outcomes,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            total,
            succeeded = report.succeeded(),
            failed = total - report.succeeded(),
            duration_ms = report.duration_ms,
            "Batch generation finished",
        );
        Ok(report)
    }
}

fn report_progress(progress: &Mutex<(usize, Box<ProgressFn>)>, total: usize) {
    let mut guard = progress.lock().unwrap_or_else(|e| e.into_inner());
    guard.0 += 1;
    let snapshot = BatchProgress { completed: guard.0, total };
    (guard.1)(snapshot);
}

/// Holds a team's `generating` flag; clears it on drop, including unwinds.
struct BusyFlag<'a> {
    roster: &'a TeamRoster,
    team_id: &'a str,
}

impl<'a> BusyFlag<'a> {
    fn raise(roster: &'a TeamRoster, team_id: &'a str) -> Self {
        roster.set_generating(team_id, true);
        Self { roster, team_id }
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.roster.set_generating(self.team_id, false);
    }
}

/// Generate one team's logo: set busy, attempt with linear backoff, record
/// the locator on success, clear busy after the final attempt.
pub async fn generate_with_retry<G: LogoGenerator + ?Sized>(
    generator: &G,
    roster: &TeamRoster,
    team: Team,
    policy: &BatchPolicy,
) -> TeamOutcome {
    let busy = BusyFlag::raise(roster, &team.id);

    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    let mut result = Err(AppError::Internal("no attempt made".into()));

    while attempts < max_attempts {
        attempts += 1;
        // Re-read so edits made while queued are honored.
        let current = roster.get(&team.id).unwrap_or_else(|| team.clone());
        match generator.generate(&current).await {
            Ok(url) => {
                roster.set_logo_url(&team.id, url.clone());
                tracing::info!(team_id = %team.id, attempt = attempts, "Logo generated");
                result = Ok(url);
                break;
            }
            Err(e) => {
                tracing::warn!(
                    team_id = %team.id,
                    attempt = attempts,
                    max_attempts,
                    error = %e,
                    "Logo generation attempt failed",
                );
                result = Err(e);
                if attempts < max_attempts {
                    tokio::time::sleep(policy.backoff(attempts)).await;
                }
            }
        }
    }

    drop(busy);
    if let Err(e) = &result {
        tracing::error!(team_id = %team.id, team = %team.name, error = %e, "Logo generation failed for {}", team.name);
    }

    TeamOutcome {
        team_id: team.id,
        team_name: team.name,
        attempts,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::team::demo_teams;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `n` calls for configured team ids, records peak concurrency.
    struct FlakyGenerator {
        roster: TeamRoster,
        failures: Mutex<HashMap<String, u32>>,
        calls: Mutex<HashMap<String, u32>>,
        peak_generating: AtomicUsize,
        delay: Duration,
    }

    impl FlakyGenerator {
        fn new(roster: TeamRoster, failures: &[(&str, u32)], delay: Duration) -> Self {
            Self {
                roster,
                failures: Mutex::new(failures.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
                calls: Mutex::new(HashMap::new()),
                peak_generating: AtomicUsize::new(0),
                delay,
            }
        }

        fn calls_for(&self, id: &str) -> u32 {
            self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl LogoGenerator for FlakyGenerator {
        async fn generate(&self, team: &Team) -> Result<String, AppError> {
            *self.calls.lock().unwrap().entry(team.id.clone()).or_default() += 1;
            self.peak_generating
                .fetch_max(self.roster.generating_count(), Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.peak_generating
                .fetch_max(self.roster.generating_count(), Ordering::SeqCst);

            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&team.id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(AppError::Generation(format!("{} rejected", team.id)));
                }
            }
            Ok(format!("https://img.test/{}", team.id))
        }
    }

    fn fast_retry_policy() -> BatchPolicy {
        BatchPolicy {
            retry_delay: Duration::from_millis(5),
            inter_entity_delay: Duration::from_millis(1),
            ..BatchPolicy::sequential_with_retry()
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<BatchProgress>>>, impl Fn(BatchProgress) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |p| sink.lock().unwrap().push(p))
    }

    #[tokio::test]
    async fn test_retry_recovers_third_team() {
        let roster = TeamRoster::new(demo_teams().into_iter().take(5).collect());
        let generator = Arc::new(FlakyGenerator::new(roster.clone(), &[("3", 2)], Duration::ZERO));
        let runner = BatchRunner::new(generator.clone(), fast_retry_policy());
        let (seen, on_progress) = recorder();

        let report = runner.run(&roster, on_progress).await.unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded(), 5);
        for o in &report.outcomes {
            let expected = if o.team_id == "3" { 3 } else { 1 };
            assert_eq!(o.attempts, expected, "team {}", o.team_id);
            assert_eq!(generator.calls_for(&o.team_id), expected);
        }
        for t in roster.snapshot() {
            assert!(!t.generating);
            assert_eq!(t.logo_url.as_deref(), Some(format!("https://img.test/{}", t.id).as_str()));
        }
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen.last().unwrap(), &BatchProgress { completed: 5, total: 5 });
    }

    #[tokio::test]
    async fn test_exhausted_retries_do_not_abort_batch() {
        let roster = TeamRoster::new(demo_teams().into_iter().take(3).collect());
        let generator = Arc::new(FlakyGenerator::new(roster.clone(), &[("2", 10)], Duration::ZERO));
        let runner = BatchRunner::new(generator.clone(), fast_retry_policy());

        let report = runner.run(&roster, |_| {}).await.unwrap();

        assert_eq!(report.succeeded(), 2);
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].team_id, "2");
        assert_eq!(failed[0].attempts, 3);
        assert!(matches!(failed[0].result, Err(AppError::Generation(_))));

        let t2 = roster.get("2").unwrap();
        assert!(!t2.generating);
        assert!(t2.logo_url.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_window_caps_in_flight_at_two() {
        let roster = TeamRoster::new(demo_teams());
        let generator = Arc::new(FlakyGenerator::new(roster.clone(), &[], Duration::from_millis(20)));
        let runner = BatchRunner::new(generator.clone(), BatchPolicy::window());
        let (seen, on_progress) = recorder();

        let report = runner.run(&roster, on_progress).await.unwrap();

        assert_eq!(report.succeeded(), 12);
        let peak = generator.peak_generating.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in-flight was {peak}");
        assert_eq!(peak, 2);
        assert_eq!(roster.generating_count(), 0);

        let completed: Vec<usize> = seen.lock().unwrap().iter().map(|p| p.completed).collect();
        assert_eq!(completed, (1..=12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_window_single_attempt_reports_failure() {
        let roster = TeamRoster::new(demo_teams().into_iter().take(4).collect());
        let generator = Arc::new(FlakyGenerator::new(roster.clone(), &[("1", 1)], Duration::ZERO));
        let runner = BatchRunner::new(generator.clone(), BatchPolicy::window());

        let report = runner.run(&roster, |_| {}).await.unwrap();

        assert_eq!(report.succeeded(), 3);
        assert_eq!(generator.calls_for("1"), 1);
        assert!(roster.snapshot().iter().all(|t| !t.generating));
    }

    struct PanicsOn(&'static str);

    #[async_trait]
    impl LogoGenerator for PanicsOn {
        async fn generate(&self, team: &Team) -> Result<String, AppError> {
            if team.id == self.0 {
                panic!("renderer crashed on {}", team.id);
            }
            Ok(format!("https://img.test/{}", team.id))
        }
    }

    #[tokio::test]
    async fn test_panicking_generator_still_completes_batch() {
        let roster = TeamRoster::new(demo_teams().into_iter().take(3).collect());
        let runner = BatchRunner::new(Arc::new(PanicsOn("2")), BatchPolicy::window());
        let (seen, on_progress) = recorder();

        let report = runner.run(&roster, on_progress).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].team_id, "2");
        assert!(matches!(failed[0].result, Err(AppError::Internal(_))));

        assert!(roster.snapshot().iter().all(|t| !t.generating));
        let completed: Vec<usize> = seen.lock().unwrap().iter().map(|p| p.completed).collect();
        assert_eq!(completed, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_roster() {
        let roster = TeamRoster::default();
        let generator = Arc::new(FlakyGenerator::new(roster.clone(), &[], Duration::ZERO));
        let report = BatchRunner::new(generator, BatchPolicy::window())
            .run(&roster, |_| panic!("no progress expected"))
            .await
            .unwrap();
        assert_eq!(report.total, 0);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_linear_backoff() {
        let p = BatchPolicy::sequential_with_retry();
        assert_eq!(p.backoff(1), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(2));
    }

    #[test]
    fn test_outcome_serializes() {
        let ok = TeamOutcome {
            team_id: "1".into(),
            team_name: "A".into(),
            attempts: 1,
            result: Ok("https://x".into()),
        };
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["result"]["logoUrl"], "https://x");

        let err = TeamOutcome {
            team_id: "2".into(),
            team_name: "B".into(),
            attempts: 3,
            result: Err(AppError::Generation("boom".into())),
        };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["result"]["failure"]["kind"], "generation");
    }
}
