//! Product studio HTTP server
//!
//! Serves the product image API: background removal, resizing, compositing,
//! optimization and batch processing.

#[cfg(feature = "cli")]
use product_studio::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
