//! Load the configuration from a file or a `String` written in [Toml format](https://en.wikipedia.org/wiki/TOML)

use std::{fs::File, io, io::Read, path::Path};

use thiserror::Error;

use crate::config::Config;

/// Error type denoting the different errors this module can fail with.
/// Parsing the configuration from Toml might fail with a
/// `toml::de::Error`, but loading that configuration from a file
/// might also fail with a `std::io::Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// Indicates there was an error when trying to load configuration from a file.
    #[error("could not read configuration file: {0}")]
    Io(#[from] io::Error),
    /// Indicates there was an error when trying to build a
    /// `basalt_config::config::Config` instance out of the Toml string given.
    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load configuration from a file written in Toml format.
pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Config, Error> {
    let mut contents = String::new();
    let mut file = File::open(filename.as_ref())?;
    file.read_to_string(&mut contents)?;

    from_str(&contents)
}

/// Load configuration from a string written in Toml format.
pub fn from_str(contents: &str) -> Result<Config, Error> {
    let config: Config = toml::from_str(contents)?;
    if config.mempool.fee_exponent <= 1.0 {
        log::warn!(
            "mempool.fee_exponent is {}; the admission fee curve is only convex above 1",
            config.mempool.fee_exponent
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_empty_config() {
        let config = from_str("").unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_error_is_reported() {
        assert!(matches!(from_str("[connections"), Err(Error::Parse(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            from_file("no-such-file.toml"),
            Err(Error::Io(_))
        ));
    }
}
