//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then `FINANCECONTROL_*` environment
//! variables, then positional command-line arguments `<facturas> <users>`.

use std::path::PathBuf;

pub const ENV_ADDR: &str = "FINANCECONTROL_ADDR";
pub const ENV_DATA_DIR: &str = "FINANCECONTROL_DATA_DIR";
pub const ENV_SEED: &str = "FINANCECONTROL_SEED";
pub const ENV_FACTURAS: &str = "FINANCECONTROL_FACTURAS";
pub const ENV_USERS: &str = "FINANCECONTROL_USERS";

/// Snapshot file kept inside the data directory
pub const SNAPSHOT_FILE: &str = "store.bin.gz";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub addr: String,
    pub data_dir: PathBuf,
    pub seed: u64,
    pub facturas: usize,
    pub users: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            addr: "127.0.0.1:3000".to_string(),
            data_dir: PathBuf::from("database"),
            seed: 42,
            facturas: 50,
            users: 20,
        }
    }
}

impl AppConfig {
    /// Reads the process environment and arguments
    pub fn load() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::from_sources(|key| std::env::var(key).ok(), &args)
    }

    /// Builds a configuration from an environment lookup and positional arguments
    ///
    /// # Arguments
    /// * `env` - Lookup for environment variables
    /// * `args` - Positional arguments, program name excluded
    ///
    /// # Returns
    /// * `Result<AppConfig, String>` - The configuration, or a message naming the bad value
    pub fn from_sources<F>(env: F, args: &[String]) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(addr) = env(ENV_ADDR) {
            config.addr = addr;
        }
        if let Some(dir) = env(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(seed) = env(ENV_SEED) {
            config.seed = parse_number(ENV_SEED, &seed)?;
        }
        if let Some(n) = env(ENV_FACTURAS) {
            config.facturas = parse_number(ENV_FACTURAS, &n)?;
        }
        if let Some(n) = env(ENV_USERS) {
            config.users = parse_number(ENV_USERS, &n)?;
        }

        if let Some(n) = args.first() {
            config.facturas = parse_number("facturas", n)?;
        }
        if let Some(n) = args.get(1) {
            config.users = parse_number("users", n)?;
        }

        Ok(config)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value for {}: {}", name, value))
}
