//! Ready-made timelines.

use crate::{BlockSequence, ExperimentConfig, Timeline};
use trialine_core::{Block, ConfigurationError, PostTrialDelay};

/// Simple reaction-time task: welcome, instructions, practice, reset,
/// test and a closing message.
pub fn simple_rt(config: &ExperimentConfig) -> Result<Timeline, ConfigurationError> {
    let cont = [config.continue_key];
    let trial = |phase: &str, repetitions: u32| {
        let block = Block::trial(config.stimulus.clone(), repetitions)
            .with_choices([config.response_key])
            .with_data("exp_id", config.exp_id.clone())
            .with_data("trial_id", phase);
        match config.response_timeout_ms {
            Some(ms) => block.with_timeout_ms(ms),
            None => block,
        }
    };
    let start_practice = config
        .start_practice_text
        .replace("{n}", &config.practice_trials.to_string());

    BlockSequence::new()
        .push(Block::message(config.welcome_text.clone()).with_dismiss_keys(cont))
        .push(
            Block::instructions(config.instructions.iter().cloned())
                .with_delay(PostTrialDelay::Fixed(config.instructions_delay_ms)),
        )
        .push(
            Block::message(start_practice)
                .with_dismiss_keys(cont)
                .with_delay(PostTrialDelay::Fixed(config.start_block_delay_ms)),
        )
        .push(trial("practice", config.practice_trials))
        .push(Block::reset())
        .push(
            Block::message(config.start_test_text.clone())
                .with_dismiss_keys(cont)
                .with_delay(PostTrialDelay::Fixed(config.start_block_delay_ms)),
        )
        .push(trial("test", config.experiment_trials))
        .push(Block::message(config.end_text.clone()).with_dismiss_keys(cont))
        .build()
}
