use std::fmt;

/// Which way a string was being converted when the codec fell back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Decode,
    Encode,
}

/// A recoverable problem. The operation that produced it carried on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A table row was skipped.
    MalformedRow { table: &'static str, line: u64, reason: String },
    /// The legacy codec rejected a string and the raw-bytes fallback was used.
    TextCodecFailure { context: String, direction: TextDirection },
    /// An area header has a length but no index-list pointer; decoded as empty.
    DanglingAreaLength { area: usize, len: u32 },
    /// The `AreaIndex` column does not match the row's position.
    AreaIndexMismatch { line: u64, index: u32, expected: u32 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MalformedRow { table, line, reason } => {
                write!(f, "{table}: skipping line {line}: {reason}")
            }
            Warning::TextCodecFailure { context, direction } => {
                let dir = match direction {
                    TextDirection::Decode => "decode",
                    TextDirection::Encode => "encode",
                };
                write!(f, "{context}: legacy {dir} failed, kept raw bytes")
            }
            Warning::DanglingAreaLength { area, len } => {
                write!(f, "area {area}: length {len} with a null index-list pointer, treated as empty")
            }
            Warning::AreaIndexMismatch { line, index, expected } => {
                write!(f, "line {line}: AreaIndex {index} does not match row position {expected}")
            }
        }
    }
}

/// Warnings collected by one operation, handed back to its caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

/// A value together with the warnings raised while producing it.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let mut diag = Diagnostics::new();
        diag.warn(Warning::DanglingAreaLength { area: 1, len: 4 });
        let mut other = Diagnostics::new();
        other.warn(Warning::MalformedRow { table: "area_entries", line: 3, reason: "bad".to_string() });
        diag.extend(other);

        assert_eq!(diag.len(), 2);
        assert_eq!(diag.warnings()[1].to_string(), "area_entries: skipping line 3: bad");
        assert_eq!(
            diag.warnings()[0].to_string(),
            "area 1: length 4 with a null index-list pointer, treated as empty"
        );
    }
}
