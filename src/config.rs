use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use forkswap_eth::alloy_primitives::{Address, address};
use forkswap_eth::types::Network;
use url::Url;

use crate::HarnessError;

pub const API_KEY_VAR: &str = "INFURA_API_KEY";
pub const ARTIFACT_VAR: &str = "SWAPPER_ARTIFACT";
pub const TIMEOUT_VAR: &str = "FORK_REQUEST_TIMEOUT_SECS";
pub const GAS_LIMIT_VAR: &str = "FORK_GAS_LIMIT";

pub const DEFAULT_ARTIFACT: &str = "artifacts/contracts/Swapper.sol/Swapper.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

/// Deploys the contract under test (first default Hardhat account)
pub const DEFAULT_DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Settings read once from the environment
#[derive(Clone)]
pub struct HarnessConfig {
   pub api_key: String,
   pub swapper_artifact: PathBuf,
   pub request_timeout: Duration,
   pub gas_limit: u64,
   pub deployer: Address,
}

impl fmt::Debug for HarnessConfig {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("HarnessConfig")
         .field("api_key", &"<redacted>")
         .field("swapper_artifact", &self.swapper_artifact)
         .field("request_timeout", &self.request_timeout)
         .field("gas_limit", &self.gas_limit)
         .field("deployer", &self.deployer)
         .finish()
   }
}

impl HarnessConfig {
   /// Defaults for everything, with the given provider key
   pub fn new(api_key: impl Into<String>) -> Self {
      Self {
         api_key: api_key.into(),
         swapper_artifact: PathBuf::from(DEFAULT_ARTIFACT),
         request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
         gas_limit: DEFAULT_GAS_LIMIT,
         deployer: DEFAULT_DEPLOYER,
      }
   }

   /// Process environment, with a `.env` file in the working directory or above filling the gaps
   pub fn from_env() -> Result<Self, HarnessError> {
      // no .env file is fine, the variables may be exported
      dotenv::dotenv().ok();
      Self::from_lookup(|key| std::env::var(key).ok())
   }

   /// Process environment first, then the variables in the env file at `path`
   ///
   /// The file is read as is, the process environment is left untouched.
   pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
      Self::from_lookup_and_file(|key| std::env::var(key).ok(), path)
   }

   /// Values from the env file at `path` fill whatever `lookup` does not have
   pub fn from_lookup_and_file<F>(lookup: F, path: impl AsRef<Path>) -> Result<Self, HarnessError>
   where
      F: Fn(&str) -> Option<String>,
   {
      let file = read_env_file(path.as_ref())?;
      Self::from_lookup(|key| lookup(key).or_else(|| file.get(key).cloned()))
   }

   /// Build the config from any key/value lookup
   ///
   /// The provider key is required, everything else falls back to its default.
   pub fn from_lookup<F>(lookup: F) -> Result<Self, HarnessError>
   where
      F: Fn(&str) -> Option<String>,
   {
      let api_key = lookup(API_KEY_VAR)
         .map(|key| key.trim().to_string())
         .filter(|key| !key.is_empty())
         .ok_or_else(|| HarnessError::ConfigurationError(format!("{} is not set", API_KEY_VAR)))?;

      let mut config = Self::new(api_key);

      if let Some(path) = lookup(ARTIFACT_VAR).filter(|p| !p.trim().is_empty()) {
         config.swapper_artifact = PathBuf::from(path.trim());
      }

      if let Some(secs) = parse_var::<u64, _>(&lookup, TIMEOUT_VAR)? {
         if secs == 0 {
            return Err(HarnessError::ConfigurationError(format!(
               "{} must be greater than zero",
               TIMEOUT_VAR
            )));
         }
         config.request_timeout = Duration::from_secs(secs);
      }

      if let Some(gas) = parse_var::<u64, _>(&lookup, GAS_LIMIT_VAR)? {
         config.gas_limit = gas;
      }

      Ok(config)
   }

   /// Provider endpoint for `network`
   pub fn endpoint(&self, network: Network) -> Result<Url, HarnessError> {
      network
         .infura_url(&self.api_key)
         .map_err(|e| HarnessError::ConfigurationError(e.to_string()))
   }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, HarnessError> {
   let entries = dotenv::from_path_iter(path)
      .map_err(|e| HarnessError::ConfigurationError(format!("{}: {}", path.display(), e)))?;

   let mut vars = HashMap::new();
   for entry in entries {
      let (key, value) =
         entry.map_err(|e| HarnessError::ConfigurationError(format!("{}: {}", path.display(), e)))?;
      vars.insert(key, value);
   }
   Ok(vars)
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, HarnessError>
where
   T: FromStr,
   T::Err: fmt::Display,
   F: Fn(&str) -> Option<String>,
{
   let Some(raw) = lookup(key) else {
      return Ok(None);
   };

   raw.trim()
      .parse::<T>()
      .map(Some)
      .map_err(|e| HarnessError::ConfigurationError(format!("{}={}: {}", key, raw, e)))
}
