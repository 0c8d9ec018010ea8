//! Terminal rendering utilities.
//!
//! Status lines, aligned tables, and `KEY=value` lines.

use std::io::{self, Write};

use console::{style, Emoji};

static CHECK: Emoji = Emoji("✓", "+");
static WARN: Emoji = Emoji("⚠", "!");

/// Print a success status line.
pub fn success(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", style(CHECK).green(), message)
}

/// Print a warning status line.
pub fn warning(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{} {}", style(WARN).yellow(), message)
}

/// One `.env` line.
pub fn env_line(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

/// Print rows under `headers`, each column padded to its widest cell.
pub fn table(out: &mut impl Write, headers: &[&str], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    write_row(out, &widths, &header)?;
    for row in rows {
        write_row(out, &widths, row)?;
    }
    Ok(())
}

fn write_row(out: &mut impl Write, widths: &[usize], cells: &[String]) -> io::Result<()> {
    let last = cells.len().saturating_sub(1);
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i == last {
            line.push_str(cell);
        } else {
            line.push_str(&format!("{cell:<width$}  "));
        }
    }
    writeln!(out, "{line}")
}
