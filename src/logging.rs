//! Console logging setup.
//!
//! Everything in the crate reports through the [`log`] macros; the binary
//! calls [`init`] once so records are printed with level-coloured prefixes.
//! `RUST_LOG` overrides the default `info` filter, e.g.
//! `RUST_LOG=caruti=trace` to see ignored uniform writes.

/// Install the `env_logger` backend. Calling it twice is harmless.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
