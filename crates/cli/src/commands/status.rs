//! `bananafit status`: show configuration status.

use bananafit_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("🍌 BananaFit Status");
    println!("===================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.generation.provider);
    println!("  Model:        {}", config.generation.model);
    println!("  API URL:      {}", config.generation.api_url);
    println!(
        "  Timeout:      {}",
        config
            .generation
            .timeout_secs
            .map_or_else(|| "none".to_string(), |s| format!("{s}s"))
    );
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Catalog:      {} persons, {} garments",
        config.catalog.persons.len(),
        config.catalog.clothing.len()
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, using defaults (run `bananafit onboard` to create one)");
    }

    Ok(())
}
