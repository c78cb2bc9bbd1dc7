#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! `seedkeeperd`: the process binary. Wires configuration, telemetry and
//! the HTTP surface together and serves until terminated.

mod bootstrap;
mod error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = bootstrap::run_app().await {
        eprintln!("seedkeeperd failed: {err}");
        std::process::exit(1);
    }
    Ok(())
}
