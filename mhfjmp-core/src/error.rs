use thiserror::Error;

/// Fatal conditions. Recoverable ones (malformed table rows, text fallbacks)
/// are reported through [`crate::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("read out of bounds: offset=0x{offset:X}, len={len}, buffer_len=0x{size:X}")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("layout overflow: write at 0x{offset:X} (len={len}) past output size 0x{size:X}")]
    LayoutOverflow { offset: usize, len: usize, size: usize },

    #[error("text pool needs {used} bytes but only {capacity} are reserved")]
    TextPoolOverflow { used: usize, capacity: usize },

    #[error("template is {len} bytes, the fixed header needs at least {required}")]
    TemplateTooSmall { len: usize, required: usize },

    #[error("{what} does not fit in a 32-bit file offset")]
    OffsetOverflow { what: &'static str },

    #[error("menu section 0x{start:X}..0x{end:X} is not a whole number of records")]
    MisalignedMenuSection { start: u32, end: u32 },

    #[error(
        "first menu title at 0x{first_title:X} lies before the menu table at 0x{start:X}; \
         set the menu entry count or use a fixed menu table location"
    )]
    MenuCountUnderivable { start: u32, first_title: u32 },

    #[error("area {area} has stage id 0 at position {position}; 0 is the list terminator")]
    ZeroStageId { area: usize, position: usize },

    #[error("unknown schema version: {0}")]
    UnknownSchema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
