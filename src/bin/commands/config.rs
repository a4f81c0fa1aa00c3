use addonkit::output::format_json;
use addonkit::{format_size, get_store_info, AddonkitConfig, OutputFormat, StoreInfo};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    store: StoreInfo,
}

pub fn run(config: &AddonkitConfig, output_format: OutputFormat) -> Result<()> {
    let info = ConfigInfo {
        config_file: config.config_file.clone(),
        data_dir: config.data_dir.clone(),
        store: get_store_info(config),
    };

    if output_format.is_json() {
        println!("{}", format_json(&[info], output_format)?);
    } else {
        // Table, Markdown, and PSV all use the same human-readable format
        print_config_table(&info);
    }
    Ok(())
}

fn print_config_table(info: &ConfigInfo) {
    println!("addonkit Configuration");
    println!("======================\n");

    println!("General:");
    println!("  Config file:    {}", info.config_file);
    println!("  Data dir:       {}", info.data_dir);
    println!();

    let store = &info.store;
    println!("Settings Database:");
    println!("  Path:           {}", store.path);
    println!(
        "  Status:         {}",
        if store.exists { "exists" } else { "not created" }
    );
    if let Some(size) = store.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    println!("  Table:          {}.{}", store.table, store.value_field);
    println!(
        "  Provisioned:    {}",
        match store.catalog_version {
            Some(version) if store.provisioned => format!("yes (catalog v{})", version),
            _ if store.provisioned => "yes".to_string(),
            _ => "no".to_string(),
        }
    );
    if let Some(count) = store.setting_count {
        println!("  Settings:       {} rows", count);
    }

    eprintln!();
    eprintln!("Tips:");
    eprintln!("  Use --format json for machine-readable output");
    eprintln!("  Edit {} to customize settings", info.config_file);
}
