use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate config text, expanding `$env{VAR}` and `~`.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    use regex::Regex;

    let re = Regex::new(super::ENV_VAR_PATTERN)
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=/path/to/traces\n\
             2. Replace $env{{{0}}} in the config file with an actual path",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables (e.g., export TRACE_DIR=/data/trace)\n\
             2. Replace the variables in the config file with actual paths",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn expand_paths(config: &mut Config) {
    let inputs = &mut config.inputs;
    inputs.machine_events = expand_tilde(&inputs.machine_events);
    inputs.batch_tasks = expand_tilde(&inputs.batch_tasks);
    inputs.batch_instances = expand_tilde(&inputs.batch_instances);

    let outputs = &mut config.outputs;
    outputs.machine_events = expand_tilde(&outputs.machine_events);
    outputs.batch_instances = expand_tilde(&outputs.batch_instances);
    outputs.report = expand_tilde(&outputs.report);
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_paths(config, &mut errors);

    if config.pipeline.progress_interval_rows == 0 {
        errors.push("pipeline.progress_interval_rows must be greater than 0".to_string());
    }

    if config.summary.enabled && config.summary.max_values_per_column == 0 {
        errors.push("summary.max_values_per_column must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_paths(config: &Config, errors: &mut Vec<String>) {
    let inputs: [(&str, &PathBuf); 3] = [
        ("inputs.machine_events", &config.inputs.machine_events),
        ("inputs.batch_tasks", &config.inputs.batch_tasks),
        ("inputs.batch_instances", &config.inputs.batch_instances),
    ];
    let outputs: [(&str, &PathBuf); 3] = [
        ("outputs.machine_events", &config.outputs.machine_events),
        ("outputs.batch_instances", &config.outputs.batch_instances),
        ("outputs.report", &config.outputs.report),
    ];

    for (name, path) in inputs.iter().chain(outputs.iter()) {
        if path.as_os_str().is_empty() {
            errors.push(format!("{}: path cannot be empty", name));
        }
    }

    let input_keys: Vec<PathBuf> = inputs.iter().map(|(_, path)| normalize_path(path)).collect();
    let output_keys: Vec<PathBuf> = outputs.iter().map(|(_, path)| normalize_path(path)).collect();

    for (i, (name, path)) in outputs.iter().enumerate() {
        if path.file_name().is_none() {
            errors.push(format!("{}: '{}' has no file name", name, path.display()));
        }

        for (j, (other_name, _)) in outputs.iter().enumerate().skip(i + 1) {
            if output_keys[i] == output_keys[j] {
                errors.push(format!(
                    "{} and {} point to the same file '{}'",
                    name,
                    other_name,
                    path.display()
                ));
            }
        }

        for (j, (input_name, _)) in inputs.iter().enumerate() {
            if output_keys[i] == input_keys[j] {
                errors.push(format!(
                    "{} would overwrite {} ('{}')",
                    name,
                    input_name,
                    path.display()
                ));
            }
        }
    }
}

/// Comparable form of a path: symlinks resolved where the file or its
/// directory exists, `.` and `..` folded lexically otherwise.
fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) {
        if let Ok(dir) = parent.canonicalize() {
            return dir.join(name);
        }
    }

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other.as_os_str()),
        }
    }
    lexical
}
