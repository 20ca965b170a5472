//! Print the partio version

use anyhow::Result;

pub async fn run() -> Result<()> {
    println!("partio {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
