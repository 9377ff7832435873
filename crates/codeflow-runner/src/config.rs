//! Runner configuration.
//!
//! Defaults can be overridden from the environment:
//! - `CODEFLOW_MAX_REPR_LEN`: longest rendered value, in characters (default 200)
//! - `CODEFLOW_TRACEBACK_LIMIT`: frames shown in a failure description (default 20)
//! - `CODEFLOW_MAX_RECURSION`: deepest call stack a traced unit may build (default 256)

use tracing::warn;

use codeflow_core::ValueRenderer;

pub const ENV_MAX_REPR_LEN: &str = "CODEFLOW_MAX_REPR_LEN";
pub const ENV_TRACEBACK_LIMIT: &str = "CODEFLOW_TRACEBACK_LIMIT";
pub const ENV_MAX_RECURSION: &str = "CODEFLOW_MAX_RECURSION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub max_repr_len: usize,
    pub traceback_limit: usize,
    pub max_recursion_depth: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            max_repr_len: ValueRenderer::DEFAULT_MAX_LEN,
            traceback_limit: 20,
            max_recursion_depth: 256,
        }
    }
}

impl RunnerConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from `lookup`. Values that do not parse as a
    /// positive integer are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = RunnerConfig::default();
        let fields = [
            (ENV_MAX_REPR_LEN, &mut config.max_repr_len),
            (ENV_TRACEBACK_LIMIT, &mut config.traceback_limit),
            (ENV_MAX_RECURSION, &mut config.max_recursion_depth),
        ];
        for (key, field) in fields {
            let Some(raw) = lookup(key) else { continue };
            match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => *field = value,
                _ => warn!(key, value = %raw, default = *field, "ignoring invalid override"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_repr_len, 200);
        assert_eq!(config.traceback_limit, 20);
        assert_eq!(config.max_recursion_depth, 256);
    }

    #[test]
    fn overrides_apply() {
        let config = RunnerConfig::from_lookup(lookup(&[
            (ENV_MAX_REPR_LEN, "80"),
            (ENV_MAX_RECURSION, " 64 "),
        ]));
        assert_eq!(config.max_repr_len, 80);
        assert_eq!(config.max_recursion_depth, 64);
        assert_eq!(config.traceback_limit, 20);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = RunnerConfig::from_lookup(lookup(&[
            (ENV_MAX_REPR_LEN, "lots"),
            (ENV_TRACEBACK_LIMIT, "0"),
            (ENV_MAX_RECURSION, "-5"),
        ]));
        assert_eq!(config, RunnerConfig::default());
    }
}
