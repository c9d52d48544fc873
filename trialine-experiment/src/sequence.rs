use crate::Timeline;
use tracing::debug;
use trialine_core::{Block, BlockKind, ConfigurationError, PostTrialDelay};

/// Collects block definitions and validates them into a [`Timeline`].
#[derive(Debug, Clone, Default)]
pub struct BlockSequence {
    blocks: Vec<Block>,
}

impl BlockSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn append(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Validates every block and the reset placement, then freezes the
    /// blocks into a timeline. Any invalid block fails the whole build.
    pub fn build(&self) -> Result<Timeline, ConfigurationError> {
        for (index, block) in self.blocks.iter().enumerate() {
            check_block(index, block)?;
        }
        check_reset_placement(&self.blocks)?;

        let timeline = Timeline::from_validated(self.blocks.clone());
        debug!(
            blocks = timeline.len(),
            instances = timeline.instance_count(),
            trials = timeline.trial_count(),
            "timeline built"
        );
        Ok(timeline)
    }
}

impl FromIterator<Block> for BlockSequence {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

impl Extend<Block> for BlockSequence {
    fn extend<I: IntoIterator<Item = Block>>(&mut self, iter: I) {
        self.blocks.extend(iter);
    }
}

fn check_block(index: usize, block: &Block) -> Result<(), ConfigurationError> {
    if block.repetitions == 0 {
        return Err(ConfigurationError::ZeroRepetitions {
            index,
            kind: block.kind,
        });
    }

    match block.kind {
        BlockKind::Trial => {
            if !block.dismiss_keys.is_empty() {
                return Err(ConfigurationError::AmbiguousAdvance { index });
            }
            if block.choices.is_empty() && block.timeout_ms.is_none() {
                return Err(ConfigurationError::NoAdvanceCondition { index });
            }
            if let PostTrialDelay::Fixed(_) = block.post_trial_delay {
                return Err(ConfigurationError::FixedTrialDelay { index });
            }
        }
        BlockKind::Reset => {
            if block.post_trial_delay == PostTrialDelay::Policy {
                return Err(ConfigurationError::PolicyDelayOnReset { index });
            }
            if block.repetitions > 1 {
                return Err(ConfigurationError::RepeatedReset {
                    index,
                    repetitions: block.repetitions,
                });
            }
        }
        BlockKind::Message | BlockKind::Instructions => {}
    }
    Ok(())
}

/// At most one reset, with trial blocks on both sides of it.
fn check_reset_placement(blocks: &[Block]) -> Result<(), ConfigurationError> {
    let mut resets = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.kind.is_reset())
        .map(|(i, _)| i);

    let Some(index) = resets.next() else {
        return Ok(());
    };
    if let Some(second) = resets.next() {
        return Err(ConfigurationError::DuplicateReset {
            first: index,
            index: second,
        });
    }
    if !blocks[..index].iter().any(|b| b.kind.is_trial()) {
        return Err(ConfigurationError::ResetBeforeTrials { index });
    }
    if !blocks[index + 1..].iter().any(|b| b.kind.is_trial()) {
        return Err(ConfigurationError::ResetAfterTrials { index });
    }
    Ok(())
}
