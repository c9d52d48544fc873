//! Validation of an experiment folder's `config.json`.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const MANIFEST_FILE: &str = "config.json";
pub const VALID_TEMPLATES: &[&str] = &["jspsych", "survey", "phaser", "custom"];

const JSPSYCH_INIT_KEYS: &[&str] = &[
    "display_element",
    "on_finish",
    "on_trial_start",
    "on_trial_finish",
    "on_data_update",
    "show_progress_bar",
    "max_load_time",
    "skip_load_check",
    "fullscreen",
    "default_iti",
];
const SURVEY_KEYS: &[&str] = &["fullscreen"];
const BOOLEAN_KEYS: &[&str] = &["show_progress_bar", "fullscreen", "skip_load_check"];
const NUMERIC_KEYS: &[&str] = &["default_iti", "max_load_time"];

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("{path}: config.json is not loadable: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: config.json is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config.json holds {0} entries, expected exactly one")]
    EntryCount(usize),

    #[error("{exp}: config.json is missing required field {field}")]
    MissingField { exp: String, field: &'static str },

    #[error("{exp}: exp_id {exp_id} does not match folder name")]
    FolderMismatch { exp: String, exp_id: String },

    #[error("{exp}: exp_id {exp_id} has invalid characters, only lowercase [a-z], [0-9] and _ allowed")]
    InvalidExpId { exp: String, exp_id: String },

    #[error("{exp}: config.json specifies not production ready")]
    NotPublished { exp: String },

    #[error("{exp}: template {template} is not one of {}", VALID_TEMPLATES.join(", "))]
    UnknownTemplate { exp: String, template: String },

    #[error("{exp}: {script} is specified in config.json but missing")]
    MissingScript { exp: String, script: String },

    #[error("{exp}: external script {script} must be https")]
    InsecureScript { exp: String, script: String },

    #[error("{exp}: experiment.js is not defined in run")]
    MissingExperimentJs { exp: String },

    #[error("{exp}: 'run' (code) is required in deployment_variables")]
    MissingDeploymentRun { exp: String },

    #[error("{exp}: {variable} is not an acceptable value for {section}")]
    UnacceptableVariable {
        exp: String,
        variable: String,
        section: &'static str,
    },

    #[error("{exp}: {variable} in {section} must be {expected}")]
    InvalidVariableValue {
        exp: String,
        variable: String,
        section: &'static str,
        expected: &'static str,
    },

    #[error("{exp}: required file {file} for template {template} not found")]
    MissingTemplateFile {
        exp: String,
        template: String,
        file: &'static str,
    },
}

/// Non-fatal findings: recommended fields left out or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestWarning {
    pub exp: String,
    pub field: &'static str,
}

impl fmt::Display for ManifestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: config.json is missing a value for {}", self.exp, self.field)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExperimentManifest {
    pub exp_id: Option<String>,
    pub name: Option<String>,
    pub contributors: Option<String>,
    pub time: Option<u64>,
    pub notes: Option<String>,
    pub reference: Option<String>,
    pub cognitive_atlas_task_id: Option<String>,
    pub run: Option<Vec<String>>,
    pub publish: Option<String>,
    pub template: Option<String>,
    pub experiment_variables: Option<Value>,
    pub deployment_variables: Option<Value>,
}

impl ExperimentManifest {
    /// Reads `<folder>/config.json`, a single-entry list or a bare object.
    pub fn load(folder: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = folder.as_ref().join(MANIFEST_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
        let entry = match value {
            Value::Array(mut entries) => {
                if entries.len() != 1 {
                    return Err(ManifestError::EntryCount(entries.len()));
                }
                entries.remove(0)
            }
            other => other,
        };
        serde_json::from_value(entry).map_err(|source| ManifestError::Parse { path, source })
    }

    /// Checks the manifest against the folder it lives in. Missing
    /// recommended fields come back as warnings.
    pub fn validate(&self, folder: impl AsRef<Path>) -> Result<Vec<ManifestWarning>, ManifestError> {
        let folder = folder.as_ref();
        let exp = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let missing = |field: &'static str| ManifestError::MissingField {
            exp: exp.clone(),
            field,
        };

        let exp_id = non_empty(&self.exp_id).ok_or_else(|| missing("exp_id"))?;
        if exp_id != exp {
            return Err(ManifestError::FolderMismatch {
                exp: exp.clone(),
                exp_id: exp_id.to_string(),
            });
        }
        if !is_valid_exp_id(exp_id) {
            return Err(ManifestError::InvalidExpId {
                exp: exp.clone(),
                exp_id: exp_id.to_string(),
            });
        }

        let run = self.run.as_deref().filter(|r| !r.is_empty()).ok_or_else(|| missing("run"))?;
        self.time.ok_or_else(|| missing("time"))?;
        let publish = non_empty(&self.publish).ok_or_else(|| missing("publish"))?;
        if publish == "False" {
            return Err(ManifestError::NotPublished { exp: exp.clone() });
        }
        let template = non_empty(&self.template).ok_or_else(|| missing("template"))?;

        for script in run {
            if script.contains("http") && !script.contains("https") {
                return Err(ManifestError::InsecureScript {
                    exp: exp.clone(),
                    script: script.clone(),
                });
            }
            if !script.contains('/') && !folder.join(script).exists() {
                return Err(ManifestError::MissingScript {
                    exp: exp.clone(),
                    script: script.clone(),
                });
            }
        }

        match template {
            "jspsych" => {
                if !run.iter().any(|s| s == "experiment.js") {
                    return Err(ManifestError::MissingExperimentJs { exp: exp.clone() });
                }
            }
            "survey" => require_file(folder, &exp, template, "survey.tsv")?,
            "phaser" => {
                require_file(folder, &exp, template, "Run.js")?;
                let has_run = self
                    .deployment_variables
                    .as_ref()
                    .and_then(Value::as_object)
                    .is_some_and(|vars| vars.contains_key("run"));
                if !has_run {
                    return Err(ManifestError::MissingDeploymentRun { exp: exp.clone() });
                }
            }
            "custom" => {}
            other => {
                return Err(ManifestError::UnknownTemplate {
                    exp: exp.clone(),
                    template: other.to_string(),
                });
            }
        }
        self.check_deployment_variables(&exp)?;

        let warnings: Vec<ManifestWarning> = [
            ("name", &self.name),
            ("reference", &self.reference),
            ("cognitive_atlas_task_id", &self.cognitive_atlas_task_id),
        ]
        .into_iter()
        .filter(|(_, value)| non_empty(*value).is_none())
        .map(|(field, _)| ManifestWarning {
            exp: exp.clone(),
            field,
        })
        .collect();
        for warning in &warnings {
            warn!("{warning}");
        }
        Ok(warnings)
    }
}

impl ExperimentManifest {
    /// `jspsych_init` (or the survey's `material_design`) settings may only
    /// use keys the runtime knows, with boolean and numeric keys typed.
    fn check_deployment_variables(&self, exp: &str) -> Result<(), ManifestError> {
        let Some(vars) = self.deployment_variables.as_ref().and_then(Value::as_object) else {
            return Ok(());
        };
        let (section, acceptable, numeric): (&'static str, &[&str], &[&str]) =
            if vars.contains_key("jspsych_init") {
                ("jspsych_init", JSPSYCH_INIT_KEYS, NUMERIC_KEYS)
            } else if vars.contains_key("survey") {
                ("material_design", SURVEY_KEYS, &[])
            } else {
                return Ok(());
            };
        let Some(settings) = vars.get(section).and_then(Value::as_object) else {
            return Ok(());
        };

        for (variable, value) in settings {
            let invalid = |expected| ManifestError::InvalidVariableValue {
                exp: exp.to_string(),
                variable: variable.clone(),
                section,
                expected,
            };
            if !acceptable.contains(&variable.as_str()) {
                return Err(ManifestError::UnacceptableVariable {
                    exp: exp.to_string(),
                    variable: variable.clone(),
                    section,
                });
            }
            if BOOLEAN_KEYS.contains(&variable.as_str()) && !value.is_boolean() {
                return Err(invalid("true/false"));
            }
            if numeric.contains(&variable.as_str()) && !value.is_number() {
                return Err(invalid("numeric"));
            }
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn is_valid_exp_id(exp_id: &str) -> bool {
    !exp_id.is_empty()
        && exp_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn require_file(
    folder: &Path,
    exp: &str,
    template: &str,
    file: &'static str,
) -> Result<(), ManifestError> {
    if folder.join(file).exists() {
        Ok(())
    } else {
        Err(ManifestError::MissingTemplateFile {
            exp: exp.to_string(),
            template: template.to_string(),
            file,
        })
    }
}
