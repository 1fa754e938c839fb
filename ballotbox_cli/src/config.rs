use log::LevelFilter;
use std::env::var;
use std::str::FromStr;

pub struct Config {
    pub key_path: String,
    pub key_bits: usize,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let key_path = match var("BALLOTBOX_KEY_PATH") {
            Ok(val) => crate::expand(&val),
            Err(_e) => "./ballotbox_authority.pem".to_owned(),
        };

        let key_bits = match var("BALLOTBOX_KEY_BITS") {
            Ok(val) => parse_key_bits(&val)?,
            Err(_e) => ballotbox::DEFAULT_KEY_BITS,
        };

        let log_level = match var("BALLOTBOX_LOG") {
            Ok(val) => LevelFilter::from_str(&val)
                .map_err(|_| format!("BALLOTBOX_LOG: invalid log level {}", val))?,
            Err(_e) => LevelFilter::Warn,
        };

        Ok(Config {
            key_path,
            key_bits,
            log_level,
        })
    }
}

pub fn parse_key_bits(val: &str) -> Result<usize, String> {
    let bits: usize = val
        .parse()
        .map_err(|_| format!("invalid key size {}", val))?;
    if bits < 1024 || bits % 8 != 0 {
        return Err(format!(
            "key size must be a multiple of 8 and at least 1024, got {}",
            bits
        ));
    }
    Ok(bits)
}
