//! Profile file loading
//!
//! The examples read a YAML file holding one or more named profiles. Each
//! profile carries Falcon API credentials, optional logging settings and
//! per-example settings, which are overlaid on top of any global example
//! settings.
//!
//! ```yaml
//! profiles:
//!   production:
//!     default: true
//!     falcon:
//!       client_id: ${FALCON_CLIENT_ID}
//!       client_secret: ${FALCON_CLIENT_SECRET}
//!       cloud_name: auto
//!     logging:
//!       level: info
//!     examples:
//!       rtr:
//!         download_event_log:
//!           filename: System.evtx
//!           output_folder: /tmp/logs
//! globals:
//!   examples:
//!     hosts:
//!       find_stale_sensors:
//!         days: 14
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use caracara_client::ClientConfig;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{ExampleError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Settings for every example of a module, keyed by example name
type ModuleSettings = BTreeMap<String, Mapping>;

/// Falcon API credentials and transport options of a profile
#[derive(Clone, Debug, Deserialize)]
pub struct FalconSettings {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub cloud_name: Option<String>,
    #[serde(default)]
    pub member_cid: Option<String>,
    #[serde(default)]
    pub ssl_verify: Option<bool>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub verbose: Option<bool>,
}

impl FalconSettings {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.client_id, &self.client_secret);
        if let Some(cloud_name) = &self.cloud_name {
            config = config.with_cloud(cloud_name);
        }
        if let Some(member_cid) = &self.member_cid {
            config = config.with_member_cid(member_cid);
        }
        if let Some(ssl_verify) = self.ssl_verify {
            config = config.with_ssl_verify(ssl_verify);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(proxy) = &self.proxy {
            config = config.with_proxy(proxy);
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent);
        }
        if let Some(verbose) = self.verbose {
            config = config.with_verbose(verbose);
        }
        config
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub falcon: Option<FalconSettings>,
    #[serde(default)]
    pub logging: Option<LoggingSettings>,
    #[serde(default)]
    pub examples: BTreeMap<String, ModuleSettings>,
}

impl Profile {
    pub fn falcon(&self) -> Result<&FalconSettings> {
        self.falcon.as_ref().ok_or_else(|| {
            ExampleError::Config(
                "you must create a falcon stanza within the profile's section of the \
                 configuration file"
                    .to_string(),
            )
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Globals {
    #[serde(default)]
    examples: BTreeMap<String, ModuleSettings>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    profiles: Option<Mapping>,
    #[serde(default)]
    globals: Option<Globals>,
}

/// The whole profile file. Profiles keep the order they appear in.
#[derive(Clone, Debug, Default)]
pub struct ExamplesConfig {
    profiles: Vec<(String, Profile)>,
    globals: BTreeMap<String, ModuleSettings>,
}

impl ExamplesConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExampleError::Config(format!(
                "you must create the file {}",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path)?;
        debug!("Loaded configuration from {}", path.display());
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(contents)?;

        let Some(mapping) = raw.profiles else {
            return Err(ExampleError::Config(
                "you must create a profiles stanza in the configuration file".to_string(),
            ));
        };

        let mut profiles = Vec::with_capacity(mapping.len());
        for (name, profile) in mapping {
            let name = scalar_to_string(&name).ok_or_else(|| {
                ExampleError::Config(format!("profile name {name:?} is not a string"))
            })?;
            let profile: Profile = match profile {
                Value::Null => Profile::default(),
                other => serde_yaml::from_value(other)?,
            };
            profiles.push((name, profile));
        }

        Ok(Self {
            profiles,
            globals: raw.globals.unwrap_or_default().examples,
        })
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Pick the profile to run with.
    ///
    /// An explicitly requested profile must exist. Otherwise a lone profile
    /// is used, then the first profile flagged as default.
    pub fn select_profile(&self, requested: Option<&str>) -> Result<(&str, &Profile)> {
        if let Some(name) = requested {
            return self
                .profiles
                .iter()
                .find(|(profile_name, _)| profile_name == name)
                .map(|(profile_name, profile)| (profile_name.as_str(), profile))
                .ok_or_else(|| ExampleError::ProfileNotFound(name.to_string()));
        }

        if let [(name, profile)] = self.profiles.as_slice() {
            return Ok((name.as_str(), profile));
        }

        self.profiles
            .iter()
            .find(|(_, profile)| profile.default)
            .map(|(name, profile)| (name.as_str(), profile))
            .ok_or_else(|| ExampleError::NoProfileSelected(self.profile_names()))
    }

    /// Settings for one example: the global settings overlaid key by key
    /// with the profile's own.
    pub fn example_settings(&self, profile: &Profile, module: &str, example: &str) -> ExampleSettings {
        let mut merged = lookup(&self.globals, module, example)
            .cloned()
            .unwrap_or_default();
        if let Some(overrides) = lookup(&profile.examples, module, example) {
            for (key, value) in overrides {
                merged.insert(key.clone(), value.clone());
            }
        }
        ExampleSettings(merged)
    }
}

fn lookup<'a>(
    tree: &'a BTreeMap<String, ModuleSettings>,
    module: &str,
    example: &str,
) -> Option<&'a Mapping> {
    tree.get(module).and_then(|examples| examples.get(example))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Free-form settings of a single example
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExampleSettings(Mapping);

impl ExampleSettings {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String setting; numbers and booleans are rendered as text
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    pub fn require_str(&self, key: &str) -> Result<String> {
        self.get_str(key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExampleError::MissingArgument(key.to_string()))
    }

    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| invalid(key, "expected a positive integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| invalid(key, "expected a positive integer")),
            Some(_) => Err(invalid(key, "expected a positive integer")),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(invalid(key, "expected a boolean")),
            },
            Some(_) => Err(invalid(key, "expected a boolean")),
        }
    }
}

impl From<Mapping> for ExampleSettings {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

fn invalid(name: &str, reason: &str) -> ExampleError {
    ExampleError::InvalidSetting {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
