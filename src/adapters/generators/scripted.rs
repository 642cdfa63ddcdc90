//! Scripted text generator for tests and offline runs.
//!
//! Replies are queued per model profile name and consumed in order; an empty
//! queue falls back to the profile's default reply, then the global default.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::errors::UpstreamError;
use crate::domain::models::{GenerationResult, ModelProfile, PromptMessage};
use crate::domain::ports::{FragmentStream, TextGenerator};

/// One scripted upstream reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Whole text; streamed in whitespace-delimited pieces.
    Text(String),
    /// Explicit fragments; joined for whole-result calls.
    Fragments(Vec<String>),
    /// Fail the call itself.
    Fail(UpstreamError),
    /// Stream these fragments, then fail mid-generation.
    BrokenStream(Vec<String>, UpstreamError),
    /// Never answer.
    Hang,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fragments(fragments.into_iter().map(Into::into).collect())
    }
}

/// A call the generator received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub profile: String,
    pub messages: Vec<PromptMessage>,
    pub streaming: bool,
}

#[derive(Debug, Default)]
struct Script {
    queues: HashMap<String, VecDeque<ScriptedReply>>,
    profile_defaults: HashMap<String, ScriptedReply>,
    calls: Vec<RecordedCall>,
}

/// In-process [`TextGenerator`] that replays scripted replies.
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    script: Arc<Mutex<Script>>,
    default_reply: ScriptedReply,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::with_default_reply(ScriptedReply::text("Scripted reply."))
    }

    pub fn with_default_reply(reply: ScriptedReply) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            default_reply: reply,
        }
    }

    /// Canned replies for running without an upstream model.
    pub fn offline(fast: &str, quality: &str, structured: &str) -> Self {
        let generator = Self::new();
        generator.set_default(fast, ScriptedReply::text("No earlier context is available offline."));
        generator.set_default(
            structured,
            ScriptedReply::text(r#"{"rationale": "Offline mode answers directly.", "strategy": 1}"#),
        );
        generator.set_default(
            quality,
            ScriptedReply::text("Offline mode: no upstream model is configured, so this is a canned reply."),
        );
        generator
    }

    /// Queue a reply for the next call on `profile`.
    pub fn push(&self, profile: &str, reply: ScriptedReply) -> &Self {
        self.lock()
            .queues
            .entry(profile.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Reply used for `profile` once its queue is empty.
    pub fn set_default(&self, profile: &str, reply: ScriptedReply) -> &Self {
        self.lock().profile_defaults.insert(profile.to_string(), reply);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, profile: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.profile == profile)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn next_reply(&self, profile: &ModelProfile, messages: &[PromptMessage], streaming: bool) -> ScriptedReply {
        let mut script = self.lock();
        script.calls.push(RecordedCall {
            profile: profile.name.clone(),
            messages: messages.to_vec(),
            streaming,
        });

        let queued = script
            .queues
            .get_mut(&profile.name)
            .and_then(VecDeque::pop_front);
        queued
            .or_else(|| script.profile_defaults.get(&profile.name).cloned())
            .unwrap_or_else(|| self.default_reply.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into pieces that concatenate back to it.
fn split_for_streaming(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(
        &self,
        profile: &ModelProfile,
        messages: &[PromptMessage],
    ) -> Result<GenerationResult, UpstreamError> {
        match self.next_reply(profile, messages, false) {
            ScriptedReply::Text(text) => Ok(GenerationResult::new(text, true)),
            ScriptedReply::Fragments(fragments) => Ok(GenerationResult::new(fragments.concat(), true)),
            ScriptedReply::Fail(err) | ScriptedReply::BrokenStream(_, err) => Err(err),
            ScriptedReply::Hang => std::future::pending().await,
        }
    }

    async fn stream(
        &self,
        profile: &ModelProfile,
        messages: &[PromptMessage],
    ) -> Result<FragmentStream, UpstreamError> {
        let items: Vec<Result<String, UpstreamError>> = match self.next_reply(profile, messages, true) {
            ScriptedReply::Text(text) => split_for_streaming(&text).into_iter().map(Ok).collect(),
            ScriptedReply::Fragments(fragments) => fragments.into_iter().map(Ok).collect(),
            ScriptedReply::Fail(err) => return Err(err),
            ScriptedReply::BrokenStream(fragments, err) => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(err)))
                .collect(),
            ScriptedReply::Hang => return Ok(stream::pending().boxed()),
        };
        Ok(stream::iter(items).boxed())
    }
}
