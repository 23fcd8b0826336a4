use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("airq version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
