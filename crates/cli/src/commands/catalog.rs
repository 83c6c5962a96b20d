//! `bananafit catalog`: list the preset persons and garments.

use bananafit_config::{AppConfig, PresetConfig};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    print_section("Persons", &config.catalog.persons);
    println!();
    print_section("Clothing", &config.catalog.clothing);

    Ok(())
}

fn print_section(title: &str, presets: &[PresetConfig]) {
    println!("{title} ({})", presets.len());
    for preset in presets {
        println!("  {:<6} {}", preset.id, preset.url);
    }
}
