//! In-process text generators.

pub mod scripted;

pub use scripted::{RecordedCall, ScriptedGenerator, ScriptedReply};
