use tether_client::PushConfig;

/// Dump the resolved config (with all defaults filled in) as TOML.  The app
/// key is masked.
pub fn show(config: &PushConfig) {
    let mut masked = config.clone();
    masked.app_key = mask(&masked.app_key);
    match toml::to_string_pretty(&masked) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => String::new(),
        n if n <= 4 => "****".into(),
        _ => format!("{}****", secret.chars().take(4).collect::<String>()),
    }
}
