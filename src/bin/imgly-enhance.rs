//! IMG.LY Enhance CLI Tool
//!
//! Command-line interface that sends an image to the enhance and
//! remove-and-enhance services and saves both results.

#[cfg(feature = "cli")]
use imgly_enhance::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<std::process::ExitCode> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
