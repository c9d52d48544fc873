use crate::{Content, KeyCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Kinds of timeline blocks and how each one advances
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Message,
    Instructions,
    Trial,
    Reset,
}

impl BlockKind {
    /// Trial blocks advance on a response (or timeout), never on a dismiss key.
    pub fn advances_on_response(&self) -> bool {
        matches!(self, Self::Trial)
    }

    /// Whether the block produces a `TrialResult` that gets recorded.
    pub fn is_trial(&self) -> bool {
        matches!(self, Self::Trial)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Message => "message",
            Self::Instructions => "instructions",
            Self::Trial => "trial",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Delay applied after a block instance before the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostTrialDelay {
    Fixed(u64),
    /// Ask the session's timing policy, once per instance, right before the
    /// delay is applied.
    Policy,
}

impl Default for PostTrialDelay {
    fn default() -> Self {
        PostTrialDelay::Fixed(0)
    }
}

fn default_repetitions() -> u32 {
    1
}

/// One declarative unit of a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    #[serde(default)]
    pub content: Content,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Keys that dismiss a message block. Empty means no key is required.
    #[serde(default)]
    pub dismiss_keys: BTreeSet<KeyCode>,
    /// Keys accepted as a response on a trial block.
    #[serde(default)]
    pub choices: BTreeSet<KeyCode>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub post_trial_delay: PostTrialDelay,
    /// Static fields copied into every result the block produces.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Block {
    pub fn new(kind: BlockKind, content: Content) -> Self {
        Self {
            kind,
            content,
            repetitions: 1,
            dismiss_keys: BTreeSet::new(),
            choices: BTreeSet::new(),
            timeout_ms: None,
            post_trial_delay: PostTrialDelay::default(),
            data: Map::new(),
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Message, Content::text(text))
    }

    pub fn instructions<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(BlockKind::Instructions, Content::pages(pages))
    }

    pub fn trial(stimulus: impl Into<String>, repetitions: u32) -> Self {
        Self {
            repetitions,
            post_trial_delay: PostTrialDelay::Policy,
            ..Self::new(BlockKind::Trial, Content::html(stimulus))
        }
    }

    pub fn reset() -> Self {
        Self::new(BlockKind::Reset, Content::None)
    }

    pub fn with_dismiss_keys(mut self, keys: impl IntoIterator<Item = KeyCode>) -> Self {
        self.dismiss_keys = keys.into_iter().collect();
        self
    }

    pub fn with_choices(mut self, keys: impl IntoIterator<Item = KeyCode>) -> Self {
        self.choices = keys.into_iter().collect();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_delay(mut self, delay: PostTrialDelay) -> Self {
        self.post_trial_delay = delay;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Whether the host has to wait for one of `dismiss_keys`.
    pub fn requires_dismissal(&self) -> bool {
        !self.kind.advances_on_response() && !self.dismiss_keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_blocks_default_to_policy_delay() {
        let block = Block::trial("<div>X</div>", 5);
        assert_eq!(block.kind, BlockKind::Trial);
        assert_eq!(block.repetitions, 5);
        assert_eq!(block.post_trial_delay, PostTrialDelay::Policy);
    }

    #[test]
    fn message_requires_dismissal_only_with_keys() {
        let bare = Block::message("hello");
        assert!(!bare.requires_dismissal());
        let keyed = Block::message("hello").with_dismiss_keys([KeyCode::ENTER]);
        assert!(keyed.requires_dismissal());
    }

    #[test]
    fn deserializes_with_defaults() {
        let block: Block = serde_json::from_str(
            r#"{"kind": "trial", "content": {"html": "<p>X</p>"}, "choices": [32],
                "post_trial_delay": "policy", "data": {"trial_id": "test"}}"#,
        )
        .unwrap();
        assert_eq!(block.repetitions, 1);
        assert!(block.choices.contains(&KeyCode::SPACE));
        assert_eq!(block.data["trial_id"], "test");

        let reset: Block = serde_json::from_str(r#"{"kind": "reset"}"#).unwrap();
        assert_eq!(reset.post_trial_delay, PostTrialDelay::Fixed(0));
        assert_eq!(reset.content, Content::None);
    }

    #[test]
    fn kind_predicates() {
        assert!(BlockKind::Trial.advances_on_response());
        assert!(!BlockKind::Message.advances_on_response());
        assert!(BlockKind::Reset.is_reset());
        assert_eq!(BlockKind::Instructions.to_string(), "instructions");
    }
}
