//! Edit engine - applies natural-language commands to the model
//!
//! Pipeline per command:
//! 1. Normalize text (trim, length cap)
//! 2. Resolve the target snapshot
//! 3. Ask the oracle for the edited scene
//! 4. Validate the proposal against the base
//! 5. Append to the store under the head check
//!
//! A command whose target is already behind the head fails before the
//! oracle is called; the append re-checks for edits that land meanwhile.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use sculpt_core::{CancelToken, SceneDescription, SculptError, SculptResult, Version};
use sculpt_oracle::{EditProposal, ReconstructionClient};
use sculpt_state::{ModelStore, Snapshot};

/// Edit engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditConfig {
    /// Longer instructions are cut to this many characters
    pub max_command_chars: usize,
}

impl Default for EditConfig {
    fn default() -> Self {
        EditConfig { max_command_chars: 600 }
    }
}

/// One edit instruction against a specific version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCommand {
    pub text: String,
    pub target_version: Version,
}

impl EditCommand {
    pub fn new(text: impl Into<String>, target_version: Version) -> Self {
        EditCommand {
            text: text.into(),
            target_version,
        }
    }
}

/// Why an edit produced nothing to store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoOpReason {
    /// Oracle returned a scene without parts
    EmptyScene,
    /// Oracle returned the base scene unchanged
    Unchanged,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::EmptyScene => write!(f, "empty scene"),
            NoOpReason::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result of applying a command
#[derive(Clone, Debug)]
pub enum EditOutcome {
    Applied(Arc<Snapshot>),
    NoOp(NoOpReason),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied(_))
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            EditOutcome::Applied(s) => Some(s),
            EditOutcome::NoOp(_) => None,
        }
    }
}

/// Applies edit commands for one session
pub struct EditEngine {
    store: Arc<ModelStore>,
    client: Arc<ReconstructionClient>,
    config: EditConfig,
}

impl EditEngine {
    pub fn new(store: Arc<ModelStore>, client: Arc<ReconstructionClient>) -> Self {
        Self::with_config(store, client, EditConfig::default())
    }

    pub fn with_config(store: Arc<ModelStore>, client: Arc<ReconstructionClient>, config: EditConfig) -> Self {
        EditEngine { store, client, config }
    }

    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    /// Command targeting the current head
    pub fn command_for_head(&self, text: impl Into<String>) -> SculptResult<EditCommand> {
        let head = self.store.head_version().ok_or(SculptError::InvalidState {
            expected: "reconstructed model",
            actual: "empty model store".to_string(),
        })?;
        Ok(EditCommand::new(text, head))
    }

    /// Trim and cap an instruction; empty input is rejected
    pub fn normalize(&self, text: &str) -> SculptResult<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SculptError::Config("edit command is empty".to_string()));
        }
        let count = trimmed.chars().count();
        if count > self.config.max_command_chars {
            debug!(chars = count, max = self.config.max_command_chars, "truncating edit command");
            return Ok(trimmed
                .chars()
                .take(self.config.max_command_chars)
                .collect::<String>()
                .trim_end()
                .to_string());
        }
        Ok(trimmed.to_string())
    }

    /// Apply one command. NoOps are reported and never stored.
    pub async fn apply_command(&self, command: &EditCommand, cancel: &CancelToken) -> SculptResult<EditOutcome> {
        let text = self.normalize(&command.text)?;
        let base = self.store.get(command.target_version)?;
        if let Some(head) = self.store.head_version().filter(|head| *head != base.version()) {
            debug!(base = %base.version(), head = %head, "edit targets a superseded version");
            return Err(SculptError::StaleEdit {
                base: base.version(),
                head,
            });
        }

        let proposal = self
            .client
            .propose_edit(base.scene(), &text, base.version(), cancel)
            .await?;

        if let Some(reason) = validate(base.scene(), &proposal)? {
            info!(base = %base.version(), %reason, "edit produced no change");
            return Ok(EditOutcome::NoOp(reason));
        }

        let snapshot = self.store.append_edit(base.version(), proposal.scene, &text).map_err(|e| {
            if let SculptError::StaleEdit { base, head } = &e {
                warn!(base = %base, head = %head, "edit lost the race for head");
            }
            e
        })?;
        Ok(EditOutcome::Applied(snapshot))
    }
}

/// Check a proposal against its base scene.
/// Returns the no-op reason, if any.
pub fn validate(base: &SceneDescription, proposal: &EditProposal) -> SculptResult<Option<NoOpReason>> {
    if proposal.scene.is_empty() {
        return Ok(Some(NoOpReason::EmptyScene));
    }
    if &proposal.scene == base {
        return Ok(Some(NoOpReason::Unchanged));
    }
    if let Some(part) = proposal
        .scene
        .part_names()
        .find(|name| !base.contains(name) && !proposal.added.contains(*name))
    {
        return Err(SculptError::UndeclaredPart { part: part.to_string() });
    }
    Ok(None)
}

impl fmt::Debug for EditEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditEngine")
            .field("head", &self.store.head_version())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sculpt_core::{OracleMode, Part, ShapeKind};
    use sculpt_oracle::{Oracle, OracleError, OraclePayload, RawResponse};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Returns a fixed body and records the last instruction it saw
    struct Fixed {
        body: String,
        seen: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Oracle for Fixed {
        async fn infer(&self, _mode: OracleMode, payload: &OraclePayload) -> Result<RawResponse, OracleError> {
            if let OraclePayload::Edit(req) = payload {
                *self.seen.lock().unwrap() = Some(req.instruction.clone());
            }
            Ok(RawResponse::new(self.body.clone()))
        }
    }

    fn base_scene() -> SceneDescription {
        SceneDescription::new().with_part("body", Part::new(ShapeKind::Cylinder).with_param("depth", 1.0))
    }

    fn engine(body: &str) -> (EditEngine, Arc<Fixed>) {
        let oracle = Arc::new(Fixed {
            body: body.to_string(),
            seen: Mutex::new(None),
        });
        let store = Arc::new(ModelStore::new());
        store.append_initial(base_scene()).unwrap();
        let client = Arc::new(ReconstructionClient::new(oracle.clone()));
        (EditEngine::new(store, client), oracle)
    }

    #[tokio::test]
    async fn test_apply_appends_snapshot() {
        let (engine, _) = engine(r#"{"parts": {"body": {"kind": "cylinder", "params": {"depth": 2}}}}"#);
        let cmd = engine.command_for_head("make it taller").unwrap();
        let outcome = engine.apply_command(&cmd, &CancelToken::new()).await.unwrap();

        let snap = outcome.snapshot().unwrap();
        assert_eq!(snap.version(), Version(1));
        assert_eq!(snap.parent_version(), Some(Version(0)));
        assert_eq!(snap.command_text(), Some("make it taller"));
        assert_eq!(snap.scene().get("body").unwrap().param_or("depth", 0.0), 2.0);
    }

    #[tokio::test]
    async fn test_unchanged_is_noop() {
        let (engine, _) = engine(r#"{"parts": {"body": {"kind": "cylinder", "params": {"depth": 1}}}}"#);
        let cmd = engine.command_for_head("leave it").unwrap();
        let outcome = engine.apply_command(&cmd, &CancelToken::new()).await.unwrap();
        assert!(matches!(outcome, EditOutcome::NoOp(NoOpReason::Unchanged)));
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_scene_is_noop() {
        let (engine, _) = engine(r#"{"parts": {}}"#);
        let cmd = engine.command_for_head("delete everything").unwrap();
        let outcome = engine.apply_command(&cmd, &CancelToken::new()).await.unwrap();
        assert!(matches!(outcome, EditOutcome::NoOp(NoOpReason::EmptyScene)));
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_undeclared_part_rejected() {
        let (engine, _) = engine(r#"{"parts": {"body": {"kind": "cylinder"}, "lid": {"kind": "plane"}}}"#);
        let cmd = engine.command_for_head("add a lid").unwrap();
        let err = engine.apply_command(&cmd, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SculptError::UndeclaredPart { ref part } if part == "lid"));
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_declared_part_accepted() {
        let (engine, _) = engine(
            r#"{"parts": {"body": {"kind": "cylinder"}, "lid": {"kind": "plane"}}, "added": ["lid"]}"#,
        );
        let cmd = engine.command_for_head("add a lid").unwrap();
        let outcome = engine.apply_command(&cmd, &CancelToken::new()).await.unwrap();
        assert!(outcome.is_applied());
    }

    #[tokio::test]
    async fn test_stale_target_rejected_before_oracle_call() {
        let (engine, oracle) = engine(r#"{"parts": {"body": {"kind": "cube"}}}"#);
        let first = engine.command_for_head("a").unwrap();
        engine.apply_command(&first, &CancelToken::new()).await.unwrap();

        *oracle.seen.lock().unwrap() = None;

        let err = engine.apply_command(&first, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            SculptError::StaleEdit { base: Version(0), head: Version(1) }
        ));
        assert_eq!(engine.store().len(), 2);
        assert_eq!(*oracle.seen.lock().unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_target_not_found() {
        let (engine, _) = engine(r#"{"parts": {"body": {"kind": "cube"}}}"#);
        let cmd = EditCommand::new("a", Version(9));
        let err = engine.apply_command(&cmd, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SculptError::NotFound(Version(9))));
    }

    #[tokio::test]
    async fn test_long_command_truncated() {
        let (engine, oracle) = engine(r#"{"parts": {"body": {"kind": "cube"}}}"#);
        let long = format!("  {}  ", "x".repeat(1000));
        let cmd = engine.command_for_head(long).unwrap();
        let outcome = engine.apply_command(&cmd, &CancelToken::new()).await.unwrap();

        let seen = oracle.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.chars().count(), 600);
        assert_eq!(outcome.snapshot().unwrap().command_text().unwrap().len(), 600);
    }

    #[test]
    fn test_blank_command_rejected() {
        let (engine, _) = engine("{}");
        assert!(matches!(engine.normalize("   \n"), Err(SculptError::Config(_))));
    }

    #[test]
    fn test_command_for_head_requires_model() {
        let store = Arc::new(ModelStore::new());
        let oracle = Arc::new(Fixed {
            body: String::new(),
            seen: Mutex::new(None),
        });
        let engine = EditEngine::new(store, Arc::new(ReconstructionClient::new(oracle)));
        assert!(matches!(engine.command_for_head("x"), Err(SculptError::InvalidState { .. })));
    }

    #[test]
    fn test_validate_rules() {
        let base = base_scene();
        let proposal = |scene: SceneDescription, added: &[&str]| EditProposal {
            scene,
            added: added.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        };

        let renamed = SceneDescription::new().with_part("hull", Part::new(ShapeKind::Cylinder));
        assert!(validate(&base, &proposal(renamed.clone(), &[])).is_err());
        assert_eq!(validate(&base, &proposal(renamed, &["hull"])).unwrap(), None);
        assert_eq!(
            validate(&base, &proposal(base.clone(), &[])).unwrap(),
            Some(NoOpReason::Unchanged)
        );
    }
}
