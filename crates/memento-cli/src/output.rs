//! Output formatting for CLI commands: table (human-readable) or JSON.

use std::io::Write;

use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Formats command results as either a human-readable table or JSON.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Creates a formatter for the given output mode.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Writes a value in the configured format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value).map_err(|e| CliError::Json {
                    path: "<stdout>".to_string(),
                    source: e,
                })?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Implemented by command result types that can render as a table.
pub trait TableDisplay {
    /// Writes the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for () {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "ok")?;
        Ok(())
    }
}

impl<T: TableDisplay> TableDisplay for Vec<T> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for (index, item) in self.iter().enumerate() {
            if index > 0 {
                writeln!(writer)?;
            }
            item.write_table(writer)?;
        }
        Ok(())
    }
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: "<stdout>".to_string(),
            source,
        }
    }
}
