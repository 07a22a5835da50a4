//! process-proxy-native: connects outward to the controller's loopback
//! TCP port, performs the fixed handshake, then serves the command
//! protocol until end-of-stream, a fatal protocol error, or EXIT (§1,
//! §4.3).

use process_proxy_native::{config::Config, error::exit_code};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Fatal boot diagnostics go straight to stderr: a logger may
            // not have anywhere useful to send them yet, and this is the
            // one failure mode the spec requires even without tracing.
            eprintln!("process-proxy-native: {e}");
            std::process::exit(boot_exit_code(&e));
        }
    };

    match process_proxy_native::run(&config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("process-proxy-native: {e}");
            std::process::exit(boot_exit_code(&e));
        }
    }
}

fn boot_exit_code(err: &process_proxy_native::NativeError) -> i32 {
    use process_proxy_native::NativeError::*;
    match err {
        MissingPort(_) => exit_code::MISSING_PORT,
        InvalidPort { .. } => exit_code::INVALID_PORT,
        Connect { .. } => exit_code::CONNECT_FAILED,
        HandshakeShortSend { .. } => exit_code::HANDSHAKE_FAILED,
        Io(_) | Wire(_) => exit_code::HANDSHAKE_FAILED,
    }
}
