//! Process-wide logging setup shared by the API server and the CLI.

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber configuration (filter, output format).
pub mod tracing;

/// Like [`init`], but logs go to stderr so stdout carries command output.
pub fn init_cli() {
    tracing::init_stderr(tracing::LogFormat::from_env());
}
