//! Runtime settings.
//!
//! Each setting is resolved from, in order: command-line flags, environment
//! variables, the `[engine]` section of `bfvm.toml` in the XDG config home,
//! and finally the built-in defaults.
//!
//! ```toml
//! [engine]
//! eof = "zero"        # 0/unchanged, 1/zero, 2/max
//! tape_size = 65536
//! max_steps = 1000000
//! wrap = true
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use cross_xdg::BaseDirs;

use crate::engine::{PointerPolicy, DEFAULT_TAPE_SIZE};
use crate::error::ConfigError;
use crate::io::EofPolicy;

pub const CONFIG_FILE_NAME: &str = "bfvm.toml";

pub const ENV_EOF: &str = "BFVM_EOF";
pub const ENV_TAPE_SIZE: &str = "BFVM_TAPE_SIZE";
pub const ENV_MAX_STEPS: &str = "BFVM_MAX_STEPS";

/// Fully resolved settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub eof: EofPolicy,
    pub tape_size: usize,
    pub max_steps: Option<u64>,
    pub pointer_policy: PointerPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            eof: EofPolicy::default(),
            tape_size: DEFAULT_TAPE_SIZE,
            max_steps: None,
            pointer_policy: PointerPolicy::default(),
        }
    }
}

/// One configuration layer; `None` means "not set here".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub eof: Option<EofPolicy>,
    pub tape_size: Option<usize>,
    pub max_steps: Option<u64>,
    pub wrap: Option<bool>,
}

impl Overrides {
    /// Fill every unset field from `lower`.
    pub fn or(self, lower: Overrides) -> Overrides {
        Overrides {
            eof: self.eof.or(lower.eof),
            tape_size: self.tape_size.or(lower.tape_size),
            max_steps: self.max_steps.or(lower.max_steps),
            wrap: self.wrap.or(lower.wrap),
        }
    }

    /// Apply this layer on top of the defaults.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let defaults = Settings::default();
        let tape_size = self.tape_size.unwrap_or(defaults.tape_size);
        if tape_size == 0 {
            return Err(ConfigError::ZeroTapeSize);
        }

        Ok(Settings {
            eof: self.eof.unwrap_or(defaults.eof),
            tape_size,
            max_steps: self.max_steps.or(defaults.max_steps),
            pointer_policy: match self.wrap {
                Some(true) => PointerPolicy::Wrap,
                Some(false) => PointerPolicy::Strict,
                None => defaults.pointer_policy,
            },
        })
    }
}

/// Resolve settings: `cli` -> environment -> config file -> defaults.
pub fn resolve(cli: Overrides) -> Result<Settings, ConfigError> {
    let env = from_env(|key| std::env::var(key).ok());
    let file = load_from_toml().unwrap_or_default();
    let settings = cli.or(env).or(file).into_settings()?;
    tracing::debug!(?settings, "settings resolved");
    Ok(settings)
}

/// Read the environment layer through `lookup`. Unparsable values are ignored.
pub fn from_env<F>(lookup: F) -> Overrides
where
    F: Fn(&str) -> Option<String>,
{
    let parsed = |key: &str, value: Option<String>| -> Option<String> {
        let value = value?;
        if value.trim().is_empty() {
            return None;
        }
        tracing::debug!(key, value = value.as_str(), "environment override");
        Some(value)
    };

    Overrides {
        eof: parsed(ENV_EOF, lookup(ENV_EOF)).and_then(|v| warn_invalid(ENV_EOF, &v, v.parse().ok())),
        tape_size: parsed(ENV_TAPE_SIZE, lookup(ENV_TAPE_SIZE))
            .and_then(|v| warn_invalid(ENV_TAPE_SIZE, &v, v.trim().parse().ok())),
        max_steps: parsed(ENV_MAX_STEPS, lookup(ENV_MAX_STEPS))
            .and_then(|v| warn_invalid(ENV_MAX_STEPS, &v, v.trim().parse().ok())),
        wrap: None,
    }
}

fn warn_invalid<T>(key: &str, raw: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        tracing::warn!(key, value = raw, "ignoring invalid setting");
    }
    value
}

fn config_path() -> Option<PathBuf> {
    // Linux: /home/<user>/.config, Windows: C:\Users\<user>\.config,
    // macOS: /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    Some(base_dirs.config_home().join(CONFIG_FILE_NAME))
}

fn load_from_toml() -> Option<Overrides> {
    let path = config_path()?;
    let content = fs::read_to_string(&path).ok()?;
    tracing::debug!(path = %path.display(), "loading config file");
    Some(parse_config(&content))
}

/// Parse the `[engine]` section of a config file.
///
/// Very small hand-rolled reader: `key = value` lines, optional quotes,
/// `#` comments. Unknown keys and bad values are skipped with a warning.
pub fn parse_config(content: &str) -> Overrides {
    let mut in_engine = false;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_engine = line[1..line.len() - 1].trim() == "engine";
            continue;
        }
        if !in_engine {
            continue;
        }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim().to_string();
            let val_raw = strip_comment(line[eq + 1..].trim());
            // Accept quoted or unquoted
            let val = if val_raw.starts_with('"') && val_raw.ends_with('"') && val_raw.len() >= 2 {
                val_raw[1..val_raw.len() - 1].to_string()
            } else {
                val_raw.to_string()
            };
            map.insert(key, val);
        }
    }

    let mut cfg = Overrides::default();

    macro_rules! set {
        ($field:ident, $key:literal, $parse:expr) => {
            if let Some(v) = map.remove($key) {
                cfg.$field = warn_invalid($key, &v, $parse(v.as_str()));
            }
        };
    }

    set!(eof, "eof", |v: &str| v.parse::<EofPolicy>().ok());
    set!(tape_size, "tape_size", |v: &str| v.parse::<usize>().ok());
    set!(max_steps, "max_steps", |v: &str| v.parse::<u64>().ok());
    set!(wrap, "wrap", |v: &str| v.parse::<bool>().ok());

    for key in map.keys() {
        tracing::warn!(key = key.as_str(), "unknown config key");
    }

    cfg
}

fn strip_comment(value: &str) -> &str {
    if value.starts_with('"') {
        return value
            .match_indices('"')
            .nth(1)
            .map(|(end, _)| &value[..=end])
            .unwrap_or(value);
    }
    value.split('#').next().unwrap_or(value).trim()
}
