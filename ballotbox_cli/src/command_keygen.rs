use crate::config::Config;
use crate::exit_with;
use ballotbox::SigningKeyMaterial;
use std::path::Path;

pub fn command_keygen(matches: &clap::ArgMatches, config: &Config) {
    let path = Path::new(&config.key_path);

    let key = if path.exists() {
        if !matches.is_present("force") {
            eprintln!(
                "ballotbox keygen: {} already exists, pass --force to replace it",
                config.key_path
            );
            std::process::exit(1);
        }
        SigningKeyMaterial::regenerate(config.key_bits)
    } else {
        SigningKeyMaterial::generate(config.key_bits)
    }
    .unwrap_or_else(|e| exit_with("keygen", e));

    key.save(path).unwrap_or_else(|e| exit_with("keygen", e));

    println!("key-path: {}", config.key_path);
    print_public_key(&key);
}

pub fn command_public_key(config: &Config) {
    let pem = std::fs::read_to_string(&config.key_path).unwrap_or_else(|e| {
        eprintln!(
            "ballotbox public-key: unable to read {}: {}",
            config.key_path, e
        );
        std::process::exit(1);
    });
    let key = SigningKeyMaterial::from_pem(&pem).unwrap_or_else(|e| exit_with("public-key", e));

    print_public_key(&key);
}

fn print_public_key(key: &SigningKeyMaterial) {
    let public = serde_json::to_string_pretty(key.public_key())
        .unwrap_or_else(|e| exit_with("public-key", e));
    println!("{}", public);
}
