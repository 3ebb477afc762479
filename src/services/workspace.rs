//! Dashboard workspace: the single owner of mode, files and analysis state.
//!
//! Every mutation bumps the revision and publishes a [`WorkspaceSnapshot`] on a
//! watch channel before returning, so subscribers always observe it.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::ai_client::AiClient;
use super::request_builder::{build_request, ModelSelection};
use crate::domain::{
    AnalysisMode, AnalysisResult, DataReadiness, ProjectFile, ProjectFileResponse,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Analyzing,
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("An analysis is already running")]
    Busy,

    #[error("File not found: {0}")]
    FileNotFound(Uuid),
}

/// Why a trigger did not start an analysis.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoFiles,
    DashboardMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Skipped(SkipReason),
    Completed(AnalysisResult),
}

/// Read-only view of the workspace handed to observers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub revision: u64,
    pub mode: AnalysisMode,
    pub phase: AnalysisPhase,
    pub files: Vec<ProjectFileResponse>,
    pub readiness: DataReadiness,
    pub result: Option<AnalysisResult>,
}

#[derive(Debug, Default)]
struct State {
    revision: u64,
    mode: AnalysisMode,
    phase: AnalysisPhase,
    files: Vec<ProjectFile>,
    result: Option<AnalysisResult>,
}

impl State {
    fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            revision: self.revision,
            mode: self.mode,
            phase: self.phase,
            files: self.files.iter().map(ProjectFileResponse::from).collect(),
            readiness: DataReadiness::from_files(&self.files),
            result: self.result.clone(),
        }
    }
}

/// Shared handle to the workspace.
#[derive(Clone)]
pub struct Workspace {
    state: Arc<Mutex<State>>,
    events: Arc<watch::Sender<WorkspaceSnapshot>>,
    client: AiClient,
    models: ModelSelection,
}

impl Workspace {
    pub fn new(client: AiClient, models: ModelSelection) -> Self {
        let state = State::default();
        let (events, _) = watch::channel(state.snapshot());
        Self {
            state: Arc::new(Mutex::new(state)),
            events: Arc::new(events),
            client,
            models,
        }
    }

    /// Bump the revision and publish the new snapshot. Call with the lock held.
    fn publish(&self, state: &mut State) {
        state.revision += 1;
        self.events.send_replace(state.snapshot());
    }

    /// Apply `f` to the state, bump the revision and notify subscribers.
    fn mutate<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock();
        let out = f(&mut state);
        self.publish(&mut state);
        out
    }

    /// Like [`Self::mutate`], but nothing is published when `f` fails.
    fn try_mutate<R, E>(&self, f: impl FnOnce(&mut State) -> Result<R, E>) -> Result<R, E> {
        let mut state = self.state.lock();
        let out = f(&mut state)?;
        self.publish(&mut state);
        Ok(out)
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkspaceSnapshot> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        self.state.lock().snapshot()
    }

    pub fn mode(&self) -> AnalysisMode {
        self.state.lock().mode
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.state.lock().phase
    }

    pub fn files(&self) -> Vec<ProjectFile> {
        self.state.lock().files.clone()
    }

    pub fn current_result(&self) -> Option<AnalysisResult> {
        self.state.lock().result.clone()
    }

    /// Switch mode. Files and the last result are kept.
    pub fn set_mode(&self, mode: AnalysisMode) {
        self.mutate(|s| s.mode = mode);
        debug!(mode = %mode, "Mode changed");
    }

    /// Insert `file`, dropping any existing file of the same declared type.
    ///
    /// Returns the replaced file, if any.
    pub fn add_or_replace(&self, file: ProjectFile) -> Option<ProjectFile> {
        let declared_type = file.declared_type;
        let file_id = file.id;
        let replaced = self.mutate(|s| {
            let replaced = s
                .files
                .iter()
                .position(|f| f.declared_type == declared_type)
                .map(|idx| s.files.remove(idx));
            s.files.push(file);
            replaced
        });

        info!(
            file_id = %file_id,
            declared_type = %declared_type,
            replaced = replaced.is_some(),
            "File added to workspace"
        );
        replaced
    }

    pub fn remove(&self, id: Uuid) -> Result<ProjectFile, WorkspaceError> {
        let removed = self.try_mutate(|s| {
            let idx = s
                .files
                .iter()
                .position(|f| f.id == id)
                .ok_or(WorkspaceError::FileNotFound(id))?;
            Ok(s.files.remove(idx))
        })?;

        info!(file_id = %id, "File removed from workspace");
        Ok(removed)
    }

    /// Run an analysis over the current files in the current mode.
    ///
    /// With no files, or in dashboard mode, this is a no-op. While another run
    /// is in flight the trigger is rejected with [`WorkspaceError::Busy`]. The
    /// run itself is detached from the caller, so the phase returns to idle
    /// even if the caller goes away.
    #[instrument(skip(self))]
    pub async fn run_analysis(&self) -> Result<AnalysisOutcome, WorkspaceError> {
        let (mode, files) = {
            let mut state = self.state.lock();
            if state.phase == AnalysisPhase::Analyzing {
                return Err(WorkspaceError::Busy);
            }
            if state.files.is_empty() {
                return Ok(AnalysisOutcome::Skipped(SkipReason::NoFiles));
            }
            if !state.mode.is_analytic() {
                return Ok(AnalysisOutcome::Skipped(SkipReason::DashboardMode));
            }

            state.phase = AnalysisPhase::Analyzing;
            state.result = None;
            self.publish(&mut state);
            (state.mode, state.files.clone())
        };

        info!(mode = %mode, files = files.len(), "Analysis started");

        let request = build_request(mode, &files, &self.models);
        let workspace = self.clone();
        let task = tokio::spawn(async move {
            let mut guard = PhaseGuard {
                workspace: &workspace,
                mode,
                finished: false,
            };
            let result = workspace.client.invoke(mode, &request).await;
            guard.finish(result.clone());
            result
        });

        match task.await {
            Ok(result) => {
                info!(
                    mode = %mode,
                    score = result.data_readiness_score,
                    fallback = result.is_fallback(),
                    "Analysis finished"
                );
                Ok(AnalysisOutcome::Completed(result))
            }
            Err(e) => {
                error!(error = %e, "Analysis task aborted");
                let result = self
                    .current_result()
                    .unwrap_or_else(|| AnalysisResult::fallback(mode, Utc::now()));
                Ok(AnalysisOutcome::Completed(result))
            }
        }
    }

    fn finish_analysis(&self, result: AnalysisResult) {
        self.mutate(|s| {
            s.result = Some(result);
            s.phase = AnalysisPhase::Idle;
        });
    }
}

/// Returns the workspace to idle if the analysis task unwinds before finishing.
struct PhaseGuard<'a> {
    workspace: &'a Workspace,
    mode: AnalysisMode,
    finished: bool,
}

impl PhaseGuard<'_> {
    fn finish(&mut self, result: AnalysisResult) {
        self.finished = true;
        self.workspace.finish_analysis(result);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.workspace
                .finish_analysis(AnalysisResult::fallback(self.mode, Utc::now()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ingest, DeclaredType};
    use crate::services::ai_client::tests::MockBackend;
    use crate::services::ai_client::{AnalysisBackend, BackendError};
    use crate::services::request_builder::AnalysisRequest;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    const OK_REPORT: &str = r#"{"executiveSummary":"OK","metrics":[],"chartData":[],"recommendations":["Hold"],"dataReadinessScore":42}"#;

    fn workspace_with(backend: Arc<dyn AnalysisBackend>) -> Workspace {
        Workspace::new(AiClient::new(backend), ModelSelection::default())
    }

    fn file(t: DeclaredType, name: &str) -> ProjectFile {
        ingest(b"data", t, name, Some("text/plain"), 4)
    }

    #[test]
    fn test_add_or_replace_keeps_one_per_type() {
        let ws = workspace_with(Arc::new(MockBackend::with_text(OK_REPORT)));
        let sequence = [
            (DeclaredType::ScheduleBaseline, "s1"),
            (DeclaredType::CostBaseline, "c1"),
            (DeclaredType::ScheduleBaseline, "s2"),
            (DeclaredType::RiskRegister, "r1"),
            (DeclaredType::CostBaseline, "c2"),
            (DeclaredType::ScheduleBaseline, "s3"),
        ];
        for (t, name) in sequence {
            ws.add_or_replace(file(t, name));
        }

        let files = ws.files();
        assert_eq!(files.len(), 3);
        for t in DeclaredType::ALL {
            assert!(files.iter().filter(|f| f.declared_type == t).count() <= 1);
        }
        let name_of = |t| {
            files
                .iter()
                .find(|f| f.declared_type == t)
                .map(|f| f.name.clone())
        };
        assert_eq!(name_of(DeclaredType::ScheduleBaseline).as_deref(), Some("s3"));
        assert_eq!(name_of(DeclaredType::CostBaseline).as_deref(), Some("c2"));
        assert_eq!(name_of(DeclaredType::RiskRegister).as_deref(), Some("r1"));
    }

    #[test]
    fn test_add_or_replace_returns_replaced() {
        let ws = workspace_with(Arc::new(MockBackend::with_text(OK_REPORT)));
        assert!(ws.add_or_replace(file(DeclaredType::Other, "a")).is_none());
        let replaced = ws.add_or_replace(file(DeclaredType::Other, "b")).unwrap();
        assert_eq!(replaced.name, "a");
    }

    #[test]
    fn test_remove_by_id() {
        let ws = workspace_with(Arc::new(MockBackend::with_text(OK_REPORT)));
        let f = file(DeclaredType::CostBaseline, "c");
        let id = f.id;
        ws.add_or_replace(f);

        assert_eq!(ws.remove(id).unwrap().name, "c");
        assert!(ws.files().is_empty());
        assert!(matches!(ws.remove(id), Err(WorkspaceError::FileNotFound(_))));
    }

    #[test]
    fn test_failed_remove_does_not_notify() {
        let ws = workspace_with(Arc::new(MockBackend::with_text(OK_REPORT)));
        ws.add_or_replace(file(DeclaredType::CostBaseline, "c"));
        let mut rx = ws.subscribe();
        let _ = rx.borrow_and_update();
        let before = ws.snapshot();

        assert!(ws.remove(Uuid::new_v4()).is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(ws.snapshot(), before);
    }

    #[test]
    fn test_mutations_notify_subscribers() {
        let ws = workspace_with(Arc::new(MockBackend::with_text(OK_REPORT)));
        let mut rx = ws.subscribe();
        assert_eq!(rx.borrow_and_update().revision, 0);

        ws.set_mode(AnalysisMode::FinancialControl);
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.revision, 1);
        assert_eq!(snap.mode, AnalysisMode::FinancialControl);

        ws.add_or_replace(file(DeclaredType::CostBaseline, "c"));
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.revision, 2);
        assert_eq!(snap.files.len(), 1);
        assert!(snap.readiness.financial_ready);
        assert!(!snap.readiness.schedule_ready);
    }

    #[tokio::test]
    async fn test_empty_file_set_is_noop() {
        let backend = Arc::new(MockBackend::with_text(OK_REPORT));
        let ws = workspace_with(backend.clone());
        ws.set_mode(AnalysisMode::ScheduleControl);
        let before = ws.snapshot();

        let outcome = ws.run_analysis().await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Skipped(SkipReason::NoFiles));
        assert_eq!(ws.phase(), AnalysisPhase::Idle);
        assert_eq!(ws.snapshot(), before);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dashboard_mode_is_noop() {
        let backend = Arc::new(MockBackend::with_text(OK_REPORT));
        let ws = workspace_with(backend.clone());
        ws.add_or_replace(file(DeclaredType::CostBaseline, "c"));

        let outcome = ws.run_analysis().await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Skipped(SkipReason::DashboardMode));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_analysis_stores_result() {
        let backend = Arc::new(MockBackend::with_text(OK_REPORT));
        let ws = workspace_with(backend.clone());
        ws.set_mode(AnalysisMode::ScheduleControl);
        ws.add_or_replace(file(DeclaredType::ScheduleBaseline, "s"));

        let outcome = ws.run_analysis().await.unwrap();
        let AnalysisOutcome::Completed(result) = outcome else {
            panic!("Expected a completed analysis");
        };
        assert_eq!(result.data_readiness_score, 42.0);
        assert_eq!(result.mode, AnalysisMode::ScheduleControl);
        assert_eq!(ws.current_result(), Some(result));
        assert_eq!(ws.phase(), AnalysisPhase::Idle);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_analysis_returns_to_idle_with_fallback() {
        let ws = workspace_with(Arc::new(MockBackend::failing()));
        ws.set_mode(AnalysisMode::FinancialControl);
        ws.add_or_replace(file(DeclaredType::CostBaseline, "c"));

        ws.run_analysis().await.unwrap();
        assert_eq!(ws.phase(), AnalysisPhase::Idle);
        let result = ws.current_result().unwrap();
        assert!(result.is_fallback());
        assert_eq!(result.recommendations.len(), 2);
    }

    #[tokio::test]
    async fn test_mode_switch_keeps_files_and_result() {
        let ws = workspace_with(Arc::new(MockBackend::with_text(OK_REPORT)));
        ws.set_mode(AnalysisMode::ScheduleControl);
        ws.add_or_replace(file(DeclaredType::ScheduleBaseline, "s"));
        ws.run_analysis().await.unwrap();

        ws.set_mode(AnalysisMode::FinancialControl);
        assert_eq!(ws.files().len(), 1);
        assert_eq!(
            ws.current_result().map(|r| r.mode),
            Some(AnalysisMode::ScheduleControl)
        );
    }

    /// Backend that blocks until released.
    struct GatedBackend {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl AnalysisBackend for GatedBackend {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn generate(&self, _request: &AnalysisRequest) -> Result<String, BackendError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(OK_REPORT.to_string())
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_phase_transitions_and_busy_guard() {
        let backend = Arc::new(GatedBackend {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let ws = workspace_with(backend.clone());
        ws.set_mode(AnalysisMode::IntegratedControl);
        ws.add_or_replace(file(DeclaredType::ScheduleBaseline, "s"));
        ws.add_or_replace(file(DeclaredType::CostBaseline, "c"));
        let mut rx = ws.subscribe();
        let _ = rx.borrow_and_update();

        let running = tokio::spawn({
            let ws = ws.clone();
            async move { ws.run_analysis().await }
        });

        backend.entered.notified().await;
        assert_eq!(ws.phase(), AnalysisPhase::Analyzing);
        assert!(ws.current_result().is_none());
        {
            let snap = rx.borrow_and_update();
            assert_eq!(snap.phase, AnalysisPhase::Analyzing);
        }

        assert!(matches!(ws.run_analysis().await, Err(WorkspaceError::Busy)));

        backend.release.notify_one();
        let outcome = running.await.unwrap().unwrap();
        assert!(matches!(outcome, AnalysisOutcome::Completed(_)));
        assert_eq!(ws.phase(), AnalysisPhase::Idle);

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.phase, AnalysisPhase::Idle);
        assert_eq!(snap.result.map(|r| r.mode), Some(AnalysisMode::IntegratedControl));
    }

    #[tokio::test]
    async fn test_dropped_caller_still_completes() {
        let backend = Arc::new(GatedBackend {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let ws = workspace_with(backend.clone());
        ws.set_mode(AnalysisMode::ScheduleControl);
        ws.add_or_replace(file(DeclaredType::ScheduleBaseline, "s"));
        let mut rx = ws.subscribe();

        let caller = tokio::spawn({
            let ws = ws.clone();
            async move { ws.run_analysis().await }
        });
        backend.entered.notified().await;
        caller.abort();
        backend.release.notify_one();

        loop {
            rx.changed().await.unwrap();
            if rx.borrow().phase == AnalysisPhase::Idle {
                break;
            }
        }
        assert_eq!(ws.current_result().unwrap().data_readiness_score, 42.0);
    }
}
