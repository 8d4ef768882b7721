//! Reader and writer for `mhfjmp.bin`, the menu/area jump table container.
//!
//! [`ContainerCodec::decode`] turns a container into editable [`MenuEntry`]
//! and [`Area`] lists; [`ContainerCodec::encode`] lays an edited set out again
//! after a template, recomputing every absolute offset.

pub mod area;
pub mod config;
pub mod container;
pub mod cursor;
pub mod diagnostics;
pub mod error;
pub mod layout;
pub mod menu;
pub mod schema;
pub mod table;

pub use area::{Area, AreaEntry, AreaHeader, AreaTableCodec};
pub use config::{LoggerConfig, ProjectConfig};
pub use container::{Container, ContainerCodec, ContainerInfo, DecodeOptions, Decoded};
pub use cursor::{ByteCursor, ByteWriter, SeekOrigin};
pub use diagnostics::{Diagnostics, Outcome, TextDirection, Warning};
pub use error::{Error, Result};
pub use layout::{ContainerLayout, EncodeOptions, Encoded, LayoutPlanner};
pub use menu::{MenuEntry, MenuRecordCodec, MenuTail, TextField, Vec3};
pub use schema::{MenuTableLocation, SchemaVersion};

pub use mhfjmp_nls as nls;
