//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Installs a stderr `fmt` subscriber filtered by the CLI flags, the cache
/// verbosity setting and `RUST_LOG`.
///
/// `cache_verbose` is the effective `verbose` option after `vek.toml`,
/// `VEK_CACHE_DEBUG`/`DEBUG` and `--verbose` have been applied; it lets the
/// per-file hit/miss events through.
pub fn init(global: &GlobalArgs, cache_verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter(global, cache_verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn filter(global: &GlobalArgs, cache_verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = level(global);
    let directives = filter_directives(level, cache_verbose && !global.quiet, rust_log);
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(base(level)))
}

fn level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    }
}

/// `vek` prefixes every crate target as well as the `vek::cache` log target.
fn base(level: &str) -> String {
    format!("vek={level}")
}

/// Merges the flag-derived level with the cache verbosity and `RUST_LOG`;
/// later directives win.
fn filter_directives(level: &str, cache_verbose: bool, rust_log: Option<&str>) -> String {
    let mut directives = base(level);
    if cache_verbose {
        directives.push_str(",vek::cache=debug");
    }
    if let Some(extra) = rust_log.map(str::trim).filter(|extra| !extra.is_empty()) {
        directives.push(',');
        directives.push_str(extra);
    }
    directives
}
