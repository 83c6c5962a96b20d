//! `bananafit doctor`: diagnose setup problems.

use bananafit_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 BananaFit Doctor");
    println!("===================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  ✅ Config file valid");
            } else {
                println!("  ⚠️  No config file, using defaults");
            }
            Some(config)
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            issues += 1;
            None
        }
    };

    if let Some(config) = config {
        if !config.has_api_key() {
            println!("  ❌ No API key: set GEMINI_API_KEY or api_key in config.toml");
            issues += 1;
        } else {
            println!("  ✅ API key configured");
            match bananafit_gateway::build_coordinator(&config) {
                Ok(coordinator) => println!(
                    "  ✅ Image model ready ({} / {})",
                    coordinator.gateway_name(),
                    config.generation.model
                ),
                Err(e) => {
                    println!("  ❌ Image model unavailable: {e}");
                    issues += 1;
                }
            }
        }

        if config.catalog.persons.is_empty() || config.catalog.clothing.is_empty() {
            println!("  ⚠️  Preset catalog is incomplete; only uploads will work");
        } else {
            println!(
                "  ✅ Catalog: {} persons, {} garments",
                config.catalog.persons.len(),
                config.catalog.clothing.len()
            );
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
