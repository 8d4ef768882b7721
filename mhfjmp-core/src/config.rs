use std::path::{Path, PathBuf};

use log::LevelFilter;
use mhfjmp_nls::Encoding;
use serde::{Deserialize, Serialize};

use crate::container::DecodeOptions;
use crate::error::Result;
use crate::layout::EncodeOptions;
use crate::schema::{MenuTableLocation, SchemaVersion, DEFAULT_SECTION_PADDING, DEFAULT_TEXT_POOL_CAPACITY};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerConfig {
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { level_filter: LevelFilter::Info }
    }
}

/// `mhfjmp.toml`. Every field is optional; relative paths are resolved
/// against the working directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Source container inside `input_dir`, also used as the encode template.
    pub container: PathBuf,
    /// Encoded container inside `output_dir`.
    pub patched: PathBuf,
    pub menu_csv: PathBuf,
    pub area_csv: PathBuf,
    pub schema: SchemaVersion,
    pub nls: Encoding,
    pub text_pool_capacity: usize,
    pub section_padding: usize,
    pub menu_table: MenuTableLocation,
    pub logger: LoggerConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            container: PathBuf::from("mhfjmp.bin"),
            patched: PathBuf::from("mhfjmp_patched.bin"),
            menu_csv: PathBuf::from("menu_entries.csv"),
            area_csv: PathBuf::from("area_entries.csv"),
            schema: SchemaVersion::default(),
            nls: Encoding::default(),
            text_pool_capacity: DEFAULT_TEXT_POOL_CAPACITY,
            section_padding: DEFAULT_SECTION_PADDING,
            menu_table: MenuTableLocation::default(),
            logger: LoggerConfig::default(),
        }
    }
}

impl ProjectConfig {
    pub const FILE_NAME: &'static str = "mhfjmp.toml";

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config_str = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads `mhfjmp.toml` from `root` when present, defaults otherwise.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(Self::FILE_NAME);
        if path.is_file() {
            log::debug!("loading {}", path.display());
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions { schema: self.schema, menu_table: self.menu_table }
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            schema: self.schema,
            text_pool_capacity: self.text_pool_capacity,
            section_padding: self.section_padding,
        }
    }

    pub fn input_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.input_dir)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir)
    }

    pub fn container_path(&self, root: &Path) -> PathBuf {
        self.input_dir(root).join(&self.container)
    }

    pub fn patched_path(&self, root: &Path) -> PathBuf {
        self.output_dir(root).join(&self.patched)
    }

    pub fn menu_csv_path(&self, root: &Path) -> PathBuf {
        self.output_dir(root).join(&self.menu_csv)
    }

    pub fn area_csv_path(&self, root: &Path) -> PathBuf {
        self.output_dir(root).join(&self.area_csv)
    }
}
