use std::path::Path;

use winnow::ascii::{digit1, space0};
use winnow::combinator::{alt, opt, preceded, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::token::{any, one_of, take_while};
use winnow::{ModalResult, Parser};

use crate::error::{MalformedRecord, TraceError};

/// Reads a whole trace file up front so that I/O failures surface before any access is simulated.
pub fn load(path: impl AsRef<Path>) -> Result<String, TraceError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| TraceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // invalid bytes end up as malformed lines instead of failing the whole trace
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Instruction,
    Load,
    Store,
    /// a load immediately followed by a store to the same address
    Modify,
    Other(char),
}

impl From<char> for Operation {
    fn from(c: char) -> Self {
        match c {
            'I' => Operation::Instruction,
            'L' => Operation::Load,
            'S' => Operation::Store,
            'M' => Operation::Modify,
            c => Operation::Other(c),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Instruction => f.write_str("I"),
            Operation::Load => f.write_str("L"),
            Operation::Store => f.write_str("S"),
            Operation::Modify => f.write_str("M"),
            Operation::Other(c) => f.write_fmt(format_args!("{c}")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub operation: Operation,
    pub address: u64,
    /// bytes touched by the access, not used by the simulation
    pub size: i32,
}

impl std::fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{} {:x},{}",
            self.operation, self.address, self.size
        ))
    }
}

impl TryFrom<&str> for TraceRecord {
    type Error = String;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        terminated(record, space0)
            .parse(line)
            .map_err(|e| {
                format!(
                    "{} (column {})",
                    e.inner().to_string().replace('\n', ", "),
                    e.offset() + 1
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEntry {
    Record(TraceRecord),
    Malformed(MalformedRecord),
}

/// Iterates over the non-blank lines of a trace, yielding the 1-based line
/// number and the parsed entry. Ends exactly at the end of the input.
#[derive(Debug, Clone)]
pub struct Trace<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Trace<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().enumerate(),
        }
    }
}

impl Iterator for Trace<'_> {
    type Item = (usize, TraceEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let (line_idx, line) = self
            .lines
            .by_ref()
            .find(|(_, line)| !line.trim().is_empty())?;

        let entry = match TraceRecord::try_from(line) {
            Ok(record) => TraceEntry::Record(record),
            Err(reason) => TraceEntry::Malformed(MalformedRecord {
                line: line_idx + 1,
                text: line.to_string(),
                reason,
            }),
        };

        Some((line_idx + 1, entry))
    }
}

fn record(input: &mut &str) -> ModalResult<TraceRecord> {
    (
        preceded(space0, operation),
        preceded(space0, address),
        preceded((',', space0), size),
    )
        .context(StrContext::Label("trace record"))
        .parse_next(input)
        .map(|(operation, address, size)| TraceRecord {
            operation,
            address,
            size,
        })
}

fn operation(input: &mut &str) -> ModalResult<Operation> {
    any.verify(|c: &char| c.is_ascii_alphabetic())
        .map(Operation::from)
        .context(StrContext::Label("operation"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a single letter operation ( I, L, S, M )",
        )))
        .parse_next(input)
}

fn address(input: &mut &str) -> ModalResult<u64> {
    preceded(
        opt(alt(("0x", "0X"))),
        take_while(1.., ('0'..='9', 'a'..='f', 'A'..='F')),
    )
    .try_map(|s| u64::from_str_radix(s, 16))
    .context(StrContext::Label("address"))
    .context(StrContext::Expected(StrContextValue::Description(
        "a hexadecimal address",
    )))
    .parse_next(input)
}

fn size(input: &mut &str) -> ModalResult<i32> {
    (opt(one_of(['+', '-'])), digit1)
        .take()
        .try_map(str::parse::<i32>)
        .context(StrContext::Label("size"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a decimal access size",
        )))
        .parse_next(input)
}
