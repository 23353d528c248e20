use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NotPositive {
        parameter: &'static str,
    },
    NotPowerOfTwo {
        parameter: &'static str,
        value: usize,
    },
    /// tag, set and offset bits must fit into a 64-bit address
    AddressTooNarrow {
        set_bits: u32,
        block_bits: u32,
    },
    TooLarge {
        lines: u128,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotPositive { parameter } => {
                f.write_fmt(format_args!("{parameter} must be greater than zero"))
            }
            ConfigError::NotPowerOfTwo { parameter, value } => {
                f.write_fmt(format_args!("{parameter} must be a power of two, got {value}"))
            }
            ConfigError::AddressTooNarrow {
                set_bits,
                block_bits,
            } => f.write_fmt(format_args!(
                "{set_bits} set bits and {block_bits} offset bits do not fit into a 64-bit address"
            )),
            ConfigError::TooLarge { lines } => f.write_fmt(format_args!(
                "{lines} cache lines exceed the limit of {}",
                crate::cache::MAX_LINES
            )),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub enum TraceError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceError::Read { path, source } => f.write_fmt(format_args!(
                "failed to read trace file '{}': {source}",
                path.display()
            )),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TraceError::Read { source, .. } => Some(source),
        }
    }
}

/// A trace line that could not be turned into a record. Skipped during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// 1-based line number in the trace
    pub line: usize,
    pub text: String,
    pub reason: String,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "line {}: '{}': {}",
            self.line, self.text, self.reason
        ))
    }
}

impl std::error::Error for MalformedRecord {}
