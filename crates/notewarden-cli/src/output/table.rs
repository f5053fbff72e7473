//! Tables for the list commands.

use anyhow::Result;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

/// Empty table with the CLI's border preset, wrapping to the terminal width.
pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_table(table: Table) -> Result<()> {
    println!("{table}");
    Ok(())
}

/// Printed instead of a header-only table.
pub fn print_empty(noun: &str) -> Result<()> {
    println!("No {noun} found.");
    Ok(())
}
