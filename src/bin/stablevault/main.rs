use anyhow::Result;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod util;
mod cmd_region;
mod cmd_snapshot;

fn init_logger() {
    // RUST_LOG wins, default is info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    use clap::Parser;

    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Init { path, span_pages } =>
            cmd_region::exec_init(path, span_pages),

        cli::Cmd::Status { path, json } =>
            cmd_region::exec_status(path, json),

        cli::Cmd::Read { path, region, offset, len, out } =>
            cmd_region::exec_read(path, region, offset, len, out),

        cli::Cmd::Write { path, region, offset, value } =>
            cmd_region::exec_write(path, region, offset, value),

        cli::Cmd::Grow { path, region, pages } =>
            cmd_region::exec_grow(path, region, pages),

        cli::Cmd::Export { path, region, out, chunk_bytes } =>
            cmd_snapshot::exec_export(path, region, out, chunk_bytes),

        cli::Cmd::Import { path, region, from, chunk_bytes } =>
            cmd_snapshot::exec_import(path, region, from, chunk_bytes),

        cli::Cmd::Inspect { file, json } =>
            cmd_snapshot::exec_inspect(file, json),

        cli::Cmd::Patch { file, field, value, out } =>
            cmd_snapshot::exec_patch(file, field, value, out),
    }
}
