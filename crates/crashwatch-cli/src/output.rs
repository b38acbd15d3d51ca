use std::io::Write;

use serde::Serialize;

use crate::error::CliError;

/// Writes `value` to stdout as one JSON document.
pub fn render<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    write_stdout(&rendered)
}

/// Writes `value` as a single NDJSON line.
pub fn render_line<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    write_stdout(&serde_json::to_string(value)?)
}

fn write_stdout(line: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}
