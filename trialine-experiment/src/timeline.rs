use std::iter::FusedIterator;
use std::sync::Arc;
use trialine_core::{Block, TrialInstance};

/// Ordered, immutable list of validated blocks.
///
/// Built through [`crate::BlockSequence::build`]; cloning is cheap and every
/// clone shares the same blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    blocks: Arc<[Block]>,
}

/// One repetition of one block, in timeline order
#[derive(Debug, Clone, Copy)]
pub struct BlockInstance<'a> {
    pub index: usize,
    pub block: &'a Block,
    pub repetition: u32,
}

impl BlockInstance<'_> {
    pub fn instance(&self) -> TrialInstance {
        TrialInstance::new(self.index, self.repetition)
    }
}

impl Timeline {
    pub(crate) fn from_validated(blocks: Vec<Block>) -> Self {
        Self {
            blocks: blocks.into(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Lazy walk over every block repetition in declaration order.
    /// Each call starts from the beginning.
    pub fn instances(&self) -> Instances<'_> {
        Instances {
            blocks: &self.blocks,
            index: 0,
            repetition: 0,
        }
    }

    pub fn for_each<F>(&self, visitor: F)
    where
        F: FnMut(BlockInstance<'_>),
    {
        self.instances().for_each(visitor)
    }

    pub fn get(&self, instance: TrialInstance) -> Option<BlockInstance<'_>> {
        let block = self.blocks.get(instance.block)?;
        (instance.repetition < block.repetitions).then_some(BlockInstance {
            index: instance.block,
            block,
            repetition: instance.repetition,
        })
    }

    /// The instance that follows `instance`, if any.
    pub fn successor(&self, instance: TrialInstance) -> Option<TrialInstance> {
        let block = self.blocks.get(instance.block)?;
        if instance.repetition + 1 < block.repetitions {
            return Some(TrialInstance::new(instance.block, instance.repetition + 1));
        }
        (instance.block + 1 < self.blocks.len()).then(|| TrialInstance::new(instance.block + 1, 0))
    }

    /// Sum of repetitions over all blocks.
    pub fn instance_count(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.repetitions)).sum()
    }

    /// Sum of repetitions over trial blocks.
    pub fn trial_count(&self) -> u64 {
        self.blocks
            .iter()
            .filter(|b| b.kind.is_trial())
            .map(|b| u64::from(b.repetitions))
            .sum()
    }
}

pub struct Instances<'a> {
    blocks: &'a [Block],
    index: usize,
    repetition: u32,
}

impl<'a> Iterator for Instances<'a> {
    type Item = BlockInstance<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = self.blocks.get(self.index)?;
            if self.repetition < block.repetitions {
                let item = BlockInstance {
                    index: self.index,
                    block,
                    repetition: self.repetition,
                };
                self.repetition += 1;
                return Some(item);
            }
            self.index += 1;
            self.repetition = 0;
        }
    }
}

impl FusedIterator for Instances<'_> {}

#[cfg(test)]
mod tests {
    use crate::BlockSequence;
    use trialine_core::{Block, BlockKind, KeyCode, TrialInstance};

    fn timeline() -> crate::Timeline {
        BlockSequence::new()
            .push(Block::message("welcome").with_dismiss_keys([KeyCode::ENTER]))
            .push(Block::trial("X", 3).with_choices([KeyCode::SPACE]))
            .push(Block::reset())
            .push(Block::trial("X", 2).with_choices([KeyCode::SPACE]))
            .build()
            .unwrap()
    }

    #[test]
    fn expands_repetitions_in_order() {
        let t = timeline();
        let walked: Vec<(usize, u32)> = t.instances().map(|i| (i.index, i.repetition)).collect();
        assert_eq!(
            walked,
            vec![(0, 0), (1, 0), (1, 1), (1, 2), (2, 0), (3, 0), (3, 1)]
        );
        assert_eq!(t.instance_count(), 7);
        assert_eq!(t.trial_count(), 5);
    }

    #[test]
    fn walking_is_restartable() {
        let t = timeline();
        let first: Vec<TrialInstance> = t.instances().map(|i| i.instance()).collect();
        let mut second = Vec::new();
        t.for_each(|i| second.push(i.instance()));
        assert_eq!(first, second);
    }

    #[test]
    fn successor_and_get_agree_with_walk() {
        let t = timeline();
        let mut cursor = Some(TrialInstance::new(0, 0));
        let mut walked = Vec::new();
        while let Some(at) = cursor {
            walked.push(t.get(at).unwrap().block.kind);
            cursor = t.successor(at);
        }
        let expected: Vec<BlockKind> = t.instances().map(|i| i.block.kind).collect();
        assert_eq!(walked, expected);
        assert!(t.get(TrialInstance::new(1, 3)).is_none());
        assert!(t.get(TrialInstance::new(9, 0)).is_none());
    }

    #[test]
    fn clones_share_blocks() {
        let t = timeline();
        let copy = t.clone();
        assert_eq!(t, copy);
        assert!(std::ptr::eq(t.blocks().as_ptr(), copy.blocks().as_ptr()));
    }
}
