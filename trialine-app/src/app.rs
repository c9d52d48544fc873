use anyhow::{Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::info;
use trialine_core::{Content, PostTrialDelay, RecordSink};
use trialine_experiment::{
    ExperimentConfig, ExperimentManifest, Session, SessionSummary, SimulatedParticipant, Timeline,
    template,
};
use trialine_store::{DataStore, ForwardingSink, JsonlStore, RunBuffer, SessionMetadata};
use trialine_timing::{HighPrecisionTimer, ManualTimer, Timer, UniformGap};

#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Experiment config (JSON); defaults to the simple RT task
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub condition: Option<String>,
    /// Table the run is inserted into
    #[arg(long, default_value = "trial_data")]
    pub table: String,
    /// Directory holding `<table>.jsonl`
    #[arg(long, default_value = "data")]
    pub out: PathBuf,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Apply delays in wall-clock time instead of a virtual clock
    #[arg(long)]
    pub realtime: bool,
    /// Insert every trial as it completes instead of one blob at the end
    #[arg(long)]
    pub per_trial: bool,
    /// Probability that the simulated participant misses a timed trial
    #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
    pub miss_rate: f64,
}

fn parse_probability(raw: &str) -> Result<f64, String> {
    let p: f64 = raw.parse().map_err(|e| format!("{raw:?} is not a number: {e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{raw} is not a probability in [0, 1]"))
    }
}

pub struct App {
    options: RunOptions,
    config: ExperimentConfig,
    timeline: Timeline,
    policy: UniformGap,
    metadata: SessionMetadata,
}

impl App {
    pub fn new(options: RunOptions) -> Result<Self> {
        let config = load_config(options.config.as_deref())?;
        let timeline = template::simple_rt(&config).context("invalid timeline")?;
        let policy = config.gap_policy().context("invalid gap range")?;
        let mut metadata = SessionMetadata::new(config.exp_id.clone(), options.subject.clone());
        if let Some(condition) = &options.condition {
            metadata = metadata.with_condition(condition.clone());
        }

        Ok(Self {
            options,
            config,
            timeline,
            policy,
            metadata,
        })
    }

    pub fn run(self) -> Result<()> {
        info!(
            exp_id = %self.config.exp_id,
            subject = %self.metadata.subject_id,
            trials = self.timeline.trial_count(),
            "starting session"
        );
        let mut store = JsonlStore::open(&self.options.out)?;

        let summary = if self.options.per_trial {
            let sink = ForwardingSink::new(&mut store, self.options.table.clone(), self.metadata.clone());
            self.run_with_timer(sink)?.0
        } else {
            let (summary, buffer) = self.run_with_timer(RunBuffer::new())?;
            let submission = buffer.into_submission(self.options.table.clone(), &self.metadata)?;
            let status = store.insert(&submission)?;
            info!(%status, "run submitted");
            summary
        };

        info!(
            trials = summary.trials_recorded,
            elapsed_ms = summary.elapsed_ms,
            path = %store.table_path(&self.options.table).display(),
            "session complete"
        );
        Ok(())
    }

    fn run_with_timer<S: RecordSink>(&self, sink: S) -> Result<(SessionSummary, S)> {
        if self.options.realtime {
            self.run_session(HighPrecisionTimer::new(), sink)
        } else {
            self.run_session(ManualTimer::new(), sink)
        }
    }

    fn run_session<T: Timer, S: RecordSink>(&self, timer: T, sink: S) -> Result<(SessionSummary, S)> {
        let (policy_rng, participant_rng) = match self.options.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_os_rng(), StdRng::from_os_rng()),
        };
        let participant =
            SimulatedParticipant::new(participant_rng).with_miss_rate(self.options.miss_rate);

        let mut session = Session::new(
            self.timeline.clone(),
            self.policy,
            timer,
            policy_rng,
            participant,
            sink,
        );
        let summary = session.run()?;
        Ok((summary, session.into_sink()))
    }
}

fn load_config(path: Option<&Path>) -> Result<ExperimentConfig> {
    match path {
        Some(path) => ExperimentConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ExperimentConfig::default()),
    }
}

pub fn print_timeline(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let timeline = template::simple_rt(&config)?;
    println!(
        "{}: {} blocks, {} instances, {} trials",
        config.exp_id,
        timeline.len(),
        timeline.instance_count(),
        timeline.trial_count()
    );
    for (index, block) in timeline.blocks().iter().enumerate() {
        let delay = match block.post_trial_delay {
            PostTrialDelay::Fixed(ms) => format!("{ms} ms"),
            PostTrialDelay::Policy => format!("{}..={} ms", config.gap_range_ms.0, config.gap_range_ms.1),
        };
        let content = match &block.content {
            Content::None => String::new(),
            content => content.describe(),
        };
        println!(
            "{index:>3}  {:<12} x{:<4} delay {:<14} {content}",
            block.kind.to_string(),
            block.repetitions,
            delay
        );
    }
    Ok(())
}

pub fn validate(folder: &Path) -> Result<()> {
    let manifest = ExperimentManifest::load(folder)?;
    let warnings = manifest.validate(folder)?;
    for warning in &warnings {
        println!("warning: {warning}");
    }
    println!("{}: valid", folder.display());
    Ok(())
}
