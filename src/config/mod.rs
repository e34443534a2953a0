pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};

pub use parse::{load_config, parse_config, ConfigError};
pub use types::{Config, InputConfig, OutputConfig, PipelineConfig, SummaryConfig};

/// `$env{NAME}` reference inside config text.
pub(crate) const ENV_VAR_PATTERN: &str = r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Substitute `$env{NAME}` references. Unset variables are left as written
/// so that validation can name them.
pub fn expand_env_vars(text: &str) -> String {
    let re = match Regex::new(ENV_VAR_PATTERN) {
        Ok(re) => re,
        Err(_) => return text.to_string(),
    };

    re.replace_all(text, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(home_dir) = dirs::home_dir() else {
        return path.to_path_buf();
    };

    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home_dir,
        Ok(rest) => home_dir.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Config file to load: `--config` if given, else the first existing
/// default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    let user_config = dirs::home_dir().map(|home| home.join(".config/tracesieve/config.yml"));
    user_config
        .into_iter()
        .chain(std::iter::once(PathBuf::from("/etc/tracesieve/config.yml")))
        .find(|candidate| candidate.exists())
}
