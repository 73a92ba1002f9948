//! Pipeline session - explicit context for one object
//!
//! Owns every component for a single capture-to-export lifecycle:
//! 1. Capture a full revolution
//! 2. Reconstruct the initial model
//! 3. Apply edits
//! 4. Render or export any version
//!
//! Sessions share no mutable state; the registry lease keeps one session
//! per object.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use sculpt_capture::{CaptureDevice, CaptureProgress, CaptureSession, CaptureState, FrameArchive};
use sculpt_core::{CancelToken, CaptureSet, ObjectId, SculptError, SculptResult, SessionId, Version};
use sculpt_edit::{EditEngine, EditOutcome, Transcriber};
use sculpt_oracle::{Oracle, ReconstructionClient};
use sculpt_script::{Script, ScriptEmitter};
use sculpt_state::{ModelStore, Snapshot};

use crate::{PipelineConfig, SessionLease};

/// Where a session is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing captured yet, or the last revolution failed
    Idle,
    /// A revolution is under way
    Capturing,
    /// A complete set is waiting for reconstruction
    Captured,
    /// The store holds at least version 0
    Modeled,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Capturing => "capturing",
            PipelineState::Captured => "captured",
            PipelineState::Modeled => "modeled",
        };
        f.write_str(s)
    }
}

/// Session counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_captured: u64,
    pub capture_failures: u64,
    pub reconstructions: u64,
    pub reconstruction_failures: u64,
    pub edits_applied: u64,
    pub edits_noop: u64,
    pub edits_failed: u64,
    pub exports: u64,
}

/// Files written by [`Session::export`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPaths {
    pub script: PathBuf,
    pub history: PathBuf,
}

/// One object's pipeline context
pub struct Session<D: CaptureDevice> {
    lease: SessionLease,
    capture: CaptureSession<D>,
    capture_set: Option<CaptureSet>,
    store: Arc<ModelStore>,
    client: Arc<ReconstructionClient>,
    editor: EditEngine,
    emitter: ScriptEmitter,
    archive: Option<FrameArchive>,
    output_dir: Option<PathBuf>,
    angle_count: u32,
    stats: SessionStats,
}

impl<D: CaptureDevice> Session<D> {
    pub fn new(lease: SessionLease, device: D, oracle: Arc<dyn Oracle>, config: &PipelineConfig) -> Self {
        let store = Arc::new(ModelStore::new());
        let client = Arc::new(ReconstructionClient::with_config(oracle, config.oracle_config()));
        let editor = EditEngine::with_config(Arc::clone(&store), Arc::clone(&client), config.edit_config());

        info!(session = %lease.session_id(), object = %lease.object_id(), "session opened");
        Session {
            capture: CaptureSession::with_config(device, config.capture_config()),
            capture_set: None,
            store,
            client,
            editor,
            emitter: ScriptEmitter::new(config.emitter_config()),
            archive: config.capture.archive_dir.clone().map(FrameArchive::new),
            output_dir: config.output_dir.clone(),
            angle_count: config.angle_count(),
            stats: SessionStats::default(),
            lease,
        }
    }

    pub fn id(&self) -> SessionId {
        self.lease.session_id()
    }

    pub fn object_id(&self) -> ObjectId {
        self.lease.object_id()
    }

    pub fn state(&self) -> PipelineState {
        if !self.store.is_empty() {
            PipelineState::Modeled
        } else if self.capture_set.is_some() {
            PipelineState::Captured
        } else {
            match self.capture.state() {
                CaptureState::Capturing(_) | CaptureState::Verifying(_) => PipelineState::Capturing,
                _ => PipelineState::Idle,
            }
        }
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Complete set awaiting reconstruction
    pub fn capture_set(&self) -> Option<&CaptureSet> {
        self.capture_set.as_ref()
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    pub fn head(&self) -> Option<Arc<Snapshot>> {
        self.store.head()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn device(&self) -> &D {
        self.capture.device()
    }

    pub fn on_capture_progress(&mut self, callback: impl FnMut(CaptureProgress) + Send + 'static) {
        self.capture.on_progress(callback);
    }

    /// Start a revolution; `None` uses the configured angle count.
    /// Any set still waiting for reconstruction is discarded.
    pub fn begin_capture(&mut self, angle_count: Option<u32>) -> SculptResult<()> {
        if !self.store.is_empty() {
            return Err(SculptError::AlreadyInitialized);
        }
        self.capture.begin(angle_count.unwrap_or(self.angle_count))?;
        if self.capture_set.take().is_some() {
            debug!(session = %self.id(), "pending capture set replaced");
        }
        Ok(())
    }

    pub async fn capture_next(&mut self, cancel: &CancelToken) -> SculptResult<CaptureProgress> {
        let result = self.capture.capture_next(cancel).await;
        match &result {
            Ok(_) => self.stats.frames_captured += 1,
            Err(e) if e.is_fatal() => self.stats.capture_failures += 1,
            Err(_) => {}
        }
        let progress = result?;
        if self.capture.state() == CaptureState::Complete {
            self.collect_capture_set().await?;
        }
        Ok(progress)
    }

    pub async fn capture_all(&mut self, cancel: &CancelToken) -> SculptResult<()> {
        while matches!(self.capture.state(), CaptureState::Capturing(_)) {
            self.capture_next(cancel).await?;
        }
        if self.capture_set.is_none() {
            return Err(SculptError::InvalidState {
                expected: "complete capture",
                actual: self.capture.state().to_string(),
            });
        }
        Ok(())
    }

    async fn collect_capture_set(&mut self) -> SculptResult<()> {
        let set = self.capture.take_capture_set()?;
        info!(session = %self.id(), frames = set.len(), "capture set complete");
        self.capture_set = Some(set);

        // Archive copies are best-effort; the set stays pending either way
        if let (Some(archive), Some(set)) = (&self.archive, &self.capture_set) {
            if let Err(e) = archive.write_set(set).await {
                warn!(session = %self.id(), dir = %archive.dir().display(), error = %e, "frame archive failed");
            }
        }
        Ok(())
    }

    /// Submit the pending capture set and store the result as version 0.
    ///
    /// The set is kept on failure so the call can be repeated.
    pub async fn reconstruct(&mut self, cancel: &CancelToken) -> SculptResult<Arc<Snapshot>> {
        if !self.store.is_empty() {
            return Err(SculptError::AlreadyInitialized);
        }
        let set = self.capture_set.as_ref().ok_or_else(|| SculptError::InvalidState {
            expected: "captured",
            actual: PipelineState::Idle.to_string(),
        })?;

        let scene = match self.client.submit(set, cancel).await {
            Ok(scene) => scene,
            Err(e) => {
                if e.is_fatal() {
                    self.stats.reconstruction_failures += 1;
                    error!(session = %self.id(), error = %e, "reconstruction failed");
                }
                return Err(e);
            }
        };

        let snapshot = self.store.append_initial(scene)?;
        self.capture_set = None;
        self.stats.reconstructions += 1;
        Ok(snapshot)
    }

    /// Apply a text instruction to the head
    pub async fn edit(&mut self, text: &str, cancel: &CancelToken) -> SculptResult<EditOutcome> {
        let result = match self.editor.command_for_head(text) {
            Ok(command) => self.editor.apply_command(&command, cancel).await,
            Err(e) => Err(e),
        };
        self.record_edit(result)
    }

    /// Transcribe and apply a spoken instruction
    pub async fn edit_voice(
        &mut self,
        transcriber: &dyn Transcriber,
        audio: &[u8],
        cancel: &CancelToken,
    ) -> SculptResult<EditOutcome> {
        let result = self.editor.apply_voice(transcriber, audio, cancel).await;
        self.record_edit(result)
    }

    fn record_edit(&mut self, result: SculptResult<EditOutcome>) -> SculptResult<EditOutcome> {
        match &result {
            Ok(EditOutcome::Applied(_)) => self.stats.edits_applied += 1,
            Ok(EditOutcome::NoOp(_)) => self.stats.edits_noop += 1,
            Err(SculptError::Cancelled) => {}
            Err(e) => {
                self.stats.edits_failed += 1;
                warn!(session = %self.id(), error = %e, "edit not applied");
            }
        }
        result
    }

    fn snapshot(&self, version: Option<Version>) -> SculptResult<Arc<Snapshot>> {
        match version {
            Some(v) => self.store.get(v),
            None => self.store.head().ok_or(SculptError::InvalidState {
                expected: "modeled",
                actual: self.state().to_string(),
            }),
        }
    }

    /// Render a version, or the head when `None`
    pub fn render(&self, version: Option<Version>) -> SculptResult<Script> {
        let snapshot = self.snapshot(version)?;
        self.emitter.render(&snapshot)
    }

    /// Write the rendered script and the full history to the output directory
    pub async fn export(&mut self, version: Option<Version>) -> SculptResult<ExportPaths> {
        let dir = self
            .output_dir
            .clone()
            .ok_or_else(|| SculptError::Config("no output_dir configured".to_string()))?;
        let paths = self.export_to(&dir, version).await?;
        self.stats.exports += 1;
        Ok(paths)
    }

    pub async fn export_to(&self, dir: &Path, version: Option<Version>) -> SculptResult<ExportPaths> {
        let snapshot = self.snapshot(version)?;
        let script = self.emitter.render(&snapshot)?;

        tokio::fs::create_dir_all(dir).await?;
        let script_path = dir.join(format!("model_v{}.{}", snapshot.version().0, script.extension()));
        tokio::fs::write(&script_path, script.text.as_bytes()).await?;

        let history_path = dir.join("history.json");
        self.store.save_json(&history_path).await?;

        info!(
            session = %self.id(),
            version = %snapshot.version(),
            script = %script_path.display(),
            skipped = script.skipped.len(),
            "model exported"
        );
        Ok(ExportPaths {
            script: script_path,
            history: history_path,
        })
    }

    /// Close the session and release the object
    pub fn discard(self) -> SessionStats {
        info!(
            session = %self.id(),
            object = %self.object_id(),
            versions = self.store.len(),
            "session discarded"
        );
        self.stats
    }
}

impl<D: CaptureDevice> fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("object", &self.object_id())
            .field("state", &self.state())
            .field("capture", &self.capture.state())
            .field("head", &self.store.head_version())
            .finish()
    }
}
