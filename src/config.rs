//! Items related to reading the workload configuration from files

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use crate::wait_for::WaitPeriod;

quick_error!{
    /// An error that can be returned from config related methods
    #[derive(Debug)]
    pub enum ConfigError {
        /// The config file could not be read
        Io(err: io::Error) {
            from()
            description("error reading config file")
            display("error reading config file: {}", err)
            cause(err)
        }
        /// The config was not valid JSON or had fields of the wrong type
        Json(err: ::serde_json::Error) {
            from()
            description("invalid json in config")
            display("invalid json in config: {}", err)
            cause(err)
        }
        /// A field had a value that is out of range
        Invalid(field: &'static str, reason: &'static str) {
            description("invalid config value")
            display("invalid value for {}: {}", field, reason)
        }
    }
}

/// A result that can be returned from config related methods
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
/// The configuration format for the `blockq` workload driver. Every field is optional.
pub struct Config {
    /// Number of producer threads
    pub producers: usize,
    /// Number of consumer threads
    pub consumers: usize,
    /// How many items each producer pushes
    pub items_per_producer: usize,
    /// Initial capacity of the queue
    pub capacity: usize,
    /// How consumers wait for items, ie. `"wait"`, `"none"`, `"10ms"` or `10`
    pub pop_wait: WaitPeriod,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            producers: 4,
            consumers: 4,
            items_per_producer: 10_000,
            capacity: 0,
            pop_wait: WaitPeriod::Wait,
        }
    }
}

impl Config {
    /// Reads and validates a JSON config from `reader`
    pub fn from_reader<R: Read>(reader: R) -> ConfigResult<Config> {
        let config: Config = ::serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the JSON config file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Checks that the values in the config can actually be run
    pub fn validate(&self) -> ConfigResult<()> {
        if self.producers == 0 {
            return Err(ConfigError::Invalid("producers", "there must be at least one producer"));
        }
        if self.consumers == 0 {
            return Err(ConfigError::Invalid("consumers", "there must be at least one consumer"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = Config::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pop_wait, WaitPeriod::Wait);
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "producers": 2,
            "consumers": 3,
            "items_per_producer": 50,
            "capacity": 128,
            "pop_wait": "5ms"
        }"#;
        let config = Config::from_reader(json.as_bytes()).unwrap();
        assert_eq!(config,
                   Config {
                       producers: 2,
                       consumers: 3,
                       items_per_producer: 50,
                       capacity: 128,
                       pop_wait: WaitPeriod::AtMost(Duration::from_millis(5)),
                   });

        let reparsed = Config::from_reader(::serde_json::to_string(&config).unwrap().as_bytes());
        assert_eq!(reparsed.unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        match Config::from_reader(r#"{ "consumers": 0 }"#.as_bytes()) {
            Err(ConfigError::Invalid(field, _)) => assert_eq!(field, "consumers"),
            other => panic!("expected invalid consumers, got {:?}", other),
        }
        match Config::from_reader(r#"{ "producers": 0 }"#.as_bytes()) {
            Err(ConfigError::Invalid(field, _)) => assert_eq!(field, "producers"),
            other => panic!("expected invalid producers, got {:?}", other),
        }
        match Config::from_reader(r#"{ "pop_wait": "later" }"#.as_bytes()) {
            Err(ConfigError::Json(_)) => {}
            other => panic!("expected json error, got {:?}", other),
        }
        match Config::from_reader(r#"{ "threads": 4 }"#.as_bytes()) {
            Err(ConfigError::Json(_)) => {}
            other => panic!("expected json error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        match Config::from_file("/nonexistent/blockq.json") {
            Err(ConfigError::Io(_)) => {}
            other => panic!("expected io error, got {:?}", other),
        }
    }
}
