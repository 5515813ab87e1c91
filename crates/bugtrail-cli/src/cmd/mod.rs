pub mod check;
pub mod completions;
pub mod replay;

use anyhow::{Context, Result};
use bugtrail_core::error::ErrorCode;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Open the row source; `-` reads standard input.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin().lock())));
    }
    let file = File::open(path)
        .with_context(|| format!("open {}", path.display()))
        .context(ErrorCode::InputNotFound)?;
    Ok(Box::new(BufReader::new(file)))
}
