//! Oracle fakes

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use sculpt_core::{OracleMode, SceneDescription};
use sculpt_oracle::{Oracle, OracleError, OraclePayload, RawResponse};

/// One scripted oracle reply
#[derive(Clone, Debug)]
pub enum Reply {
    Body(String),
    Fail(OracleError),
    /// Never answer (until cancelled)
    Hang,
}

impl Reply {
    /// Reply with `scene` in the response layout
    pub fn scene(scene: &SceneDescription) -> Self {
        Reply::Body(json!({ "parts": scene.parts }).to_string())
    }

    /// Edit reply declaring `added` parts
    pub fn edit(scene: &SceneDescription, added: &[&str]) -> Self {
        Reply::Body(json!({ "parts": scene.parts, "added": added }).to_string())
    }

    pub fn invalid(reason: &str) -> Self {
        Reply::Fail(OracleError::Invalid(reason.to_string()))
    }

    pub fn transient() -> Self {
        Reply::Fail(OracleError::Transient("connection reset".to_string()))
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Reply>,
    calls: u32,
    last_payload: Option<serde_json::Value>,
}

impl Script {
    /// Next reply; the final reply repeats forever
    fn next(&mut self) -> Option<Reply> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// Oracle with per-mode reply queues
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    reconstruct: Mutex<Script>,
    edit: Mutex<Script>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, mode: OracleMode) -> &Mutex<Script> {
        match mode {
            OracleMode::Reconstruct => &self.reconstruct,
            OracleMode::Edit => &self.edit,
        }
    }

    /// Queue a reconstruction reply
    pub fn on_reconstruct(self, reply: Reply) -> Self {
        self.reconstruct.lock().replies.push_back(reply);
        self
    }

    /// Queue an edit reply
    pub fn on_edit(self, reply: Reply) -> Self {
        self.edit.lock().replies.push_back(reply);
        self
    }

    pub fn calls(&self, mode: OracleMode) -> u32 {
        self.script(mode).lock().calls
    }

    /// Most recent payload received in `mode`
    pub fn last_payload(&self, mode: OracleMode) -> Option<serde_json::Value> {
        self.script(mode).lock().last_payload.clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn infer(&self, mode: OracleMode, payload: &OraclePayload) -> Result<RawResponse, OracleError> {
        let reply = {
            let mut script = self.script(mode).lock();
            script.calls += 1;
            script.last_payload = Some(payload.to_json());
            script.next()
        };
        match reply {
            Some(Reply::Body(body)) => Ok(RawResponse::new(body)),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(OracleError::Invalid(format!("no scripted reply for {} mode", mode))),
        }
    }
}

/// Oracle that answers with a fixed scene but fails at seeded rates
#[derive(Debug)]
pub struct FlakyOracle {
    scene: SceneDescription,
    rate_limit_rate: f64,
    transient_rate: f64,
    rng: Mutex<StdRng>,
}

impl FlakyOracle {
    pub fn new(scene: SceneDescription, rate_limit_rate: f64, transient_rate: f64, seed: u64) -> Self {
        FlakyOracle {
            scene,
            rate_limit_rate,
            transient_rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl Oracle for FlakyOracle {
    async fn infer(&self, _mode: OracleMode, _payload: &OraclePayload) -> Result<RawResponse, OracleError> {
        let roll: f64 = self.rng.lock().gen();
        if roll < self.rate_limit_rate {
            return Err(OracleError::RateLimited { retry_after: None });
        }
        if roll < self.rate_limit_rate + self.transient_rate {
            return Err(OracleError::Transient("upstream timeout".to_string()));
        }
        Ok(RawResponse::new(json!({ "parts": self.scene.parts }).to_string()))
    }
}
