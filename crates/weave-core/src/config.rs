//! Runtime configuration.

use std::time::Duration;

/// Environment variable overriding [`RuntimeConfig::time_slice`], in milliseconds.
pub const TIME_SLICE_ENV: &str = "WEAVE_TIME_SLICE_MS";
/// Environment variable enabling [`RuntimeConfig::strict_hook_order`] (`1`/`true`).
pub const STRICT_HOOKS_ENV: &str = "WEAVE_STRICT_HOOKS";

const DEFAULT_TIME_SLICE: Duration = Duration::from_millis(5);

/// Tunables for a render root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Budget of a single work-loop slice when the root measures time with a clock.
    pub time_slice: Duration,
    /// Fail a render when a component calls its hooks in a different sequence
    /// than on its previous render, instead of logging and binding positionally.
    pub strict_hook_order: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            time_slice: DEFAULT_TIME_SLICE,
            strict_hook_order: false,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the time slice used by clock-driven yield policies.
    #[must_use]
    pub fn with_time_slice(mut self, time_slice: Duration) -> Self {
        self.time_slice = time_slice;
        self
    }

    /// Enable or disable strict hook-order checking.
    #[must_use]
    pub fn with_strict_hook_order(mut self, strict: bool) -> Self {
        self.strict_hook_order = strict;
        self
    }

    /// Defaults overridden by [`TIME_SLICE_ENV`] and [`STRICT_HOOKS_ENV`].
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(TIME_SLICE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(millis) => config.time_slice = Duration::from_millis(millis),
                Err(err) => log::warn!("ignoring {TIME_SLICE_ENV}={raw:?}: {err}"),
            }
        }
        if let Some(raw) = lookup(STRICT_HOOKS_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.strict_hook_order = true,
                "0" | "false" | "no" | "off" | "" => config.strict_hook_order = false,
                other => log::warn!("ignoring {STRICT_HOOKS_ENV}={other:?}"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_overrides_defaults() {
        let config = RuntimeConfig::from_lookup(|name| match name {
            TIME_SLICE_ENV => Some("12".into()),
            STRICT_HOOKS_ENV => Some("true".into()),
            _ => None,
        });
        assert_eq!(config.time_slice, Duration::from_millis(12));
        assert!(config.strict_hook_order);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = RuntimeConfig::from_lookup(|name| match name {
            TIME_SLICE_ENV => Some("soon".into()),
            STRICT_HOOKS_ENV => Some("maybe".into()),
            _ => None,
        });
        assert_eq!(config, RuntimeConfig::default());
    }
}
