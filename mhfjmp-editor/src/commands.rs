use anyhow::{bail, Context, Result};
use mhfjmp_core::nls::TextCodec;
use mhfjmp_core::{table, Container, ContainerCodec, Diagnostics, ProjectConfig};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::output::write_atomic;

fn codec(config: &ProjectConfig) -> ContainerCodec {
    ContainerCodec::new(TextCodec::new(config.nls))
}

fn summarize(what: &str, diagnostics: &Diagnostics) {
    if !diagnostics.is_empty() {
        log::warn!("{}: {} warning(s)", what, diagnostics.len());
    }
}

pub fn generate_folders(config: &ProjectConfig, root: &Path) -> Result<()> {
    for dir in [config.input_dir(root), config.output_dir(root)] {
        if dir.is_dir() {
            log::info!("folder {} already exists", dir.display());
        } else {
            fs::create_dir_all(&dir).with_context(|| format!("creating folder {}", dir.display()))?;
            log::info!("folder {} created", dir.display());
        }
    }
    Ok(())
}

pub fn extract(config: &ProjectConfig, root: &Path) -> Result<()> {
    let input = config.container_path(root);
    if !input.is_file() {
        bail!("required file {} not found", input.display());
    }
    let bytes = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;

    let decoded = codec(config)
        .decode(&bytes, &config.decode_options())
        .with_context(|| format!("decoding {}", input.display()))?;
    summarize("extract", &decoded.diagnostics);
    let container = decoded.value.container;

    let output_dir = config.output_dir(root);
    fs::create_dir_all(&output_dir).with_context(|| format!("creating folder {}", output_dir.display()))?;

    let menu_path = config.menu_csv_path(root);
    write_atomic(&menu_path, |w| Ok(table::write_menu_table(w, config.schema, &container.menu_entries)?))
        .with_context(|| format!("writing {}", menu_path.display()))?;
    let area_path = config.area_csv_path(root);
    write_atomic(&area_path, |w| Ok(table::write_area_table(w, &container.areas)?))
        .with_context(|| format!("writing {}", area_path.display()))?;

    log::info!(
        "extracted {} menu entries to {} and {} areas to {}",
        container.menu_entries.len(),
        menu_path.display(),
        container.areas.len(),
        area_path.display()
    );
    Ok(())
}

pub fn inject(config: &ProjectConfig, root: &Path) -> Result<()> {
    let menu_path = config.menu_csv_path(root);
    let menu_file = File::open(&menu_path).with_context(|| format!("opening {}", menu_path.display()))?;
    let menu = table::read_menu_table(BufReader::new(menu_file), config.schema)
        .with_context(|| format!("reading {}", menu_path.display()))?;
    summarize(table::MENU_TABLE, &menu.diagnostics);

    let area_path = config.area_csv_path(root);
    let area_file = File::open(&area_path).with_context(|| format!("opening {}", area_path.display()))?;
    let areas = table::read_area_table(BufReader::new(area_file))
        .with_context(|| format!("reading {}", area_path.display()))?;
    summarize(table::AREA_TABLE, &areas.diagnostics);

    let template_path = config.container_path(root);
    let template = fs::read(&template_path).with_context(|| format!("reading {}", template_path.display()))?;
    log::info!(
        "loaded {} menu entries, {} areas, template {} bytes",
        menu.value.len(),
        areas.value.len(),
        template.len()
    );

    let container = Container { menu_entries: menu.value, areas: areas.value };
    let encoded = codec(config)
        .encode(&container, &template, &config.encode_options())
        .context("encoding container")?;
    summarize("inject", &encoded.diagnostics);

    let layout = &encoded.value.layout;
    log::info!(
        "menu @0x{:X}, text pool @0x{:X} ({} of {} bytes), areas @0x{:X}",
        layout.menu_start,
        layout.text_pool_start,
        layout.text_pool_len,
        config.text_pool_capacity,
        layout.area_start
    );

    let patched = config.patched_path(root);
    let output_dir = config.output_dir(root);
    fs::create_dir_all(&output_dir).with_context(|| format!("creating folder {}", output_dir.display()))?;
    write_atomic(&patched, |w| Ok(w.write_all(&encoded.value.bytes)?))
        .with_context(|| format!("writing {}", patched.display()))?;
    log::info!("wrote {} ({} bytes)", patched.display(), encoded.value.bytes.len());
    Ok(())
}
