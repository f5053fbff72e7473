use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// One pretty-printed document per command, so output can be piped to `jq`.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
