//! Command: print version information.

/// Version string, preferring the one stamped in at build time.
#[must_use]
pub fn version() -> &'static str {
    option_env!("SUBSTITUTE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the substitute version to stdout.
pub fn run() {
    println!("substitute {}", version());
}
