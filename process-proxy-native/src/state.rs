//! Process-global state captured once at startup (§4.3, §9).

/// Arguments are captured once at startup, since `std::env::args()`
/// reflects how the process itself was invoked and does not change.
/// Environment and cwd are read on demand instead (§9): no caching is
/// required or wanted, since a spawned child could plausibly `chdir` or
/// mutate its own environment between requests in future extensions of
/// this endpoint, even though the current command set has no such op.
pub struct NativeState {
    argv: Vec<String>,
}

impl NativeState {
    pub fn capture() -> Self {
        Self {
            argv: std::env::args().collect(),
        }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Current working directory as UTF-8. On platforms whose directory
    /// API is wide-character, the OS string is converted via lossy UTF-8
    /// conversion (§4.2 "Path encoding"); a cwd that cannot be represented
    /// at all is reported as an io error rather than silently mangled. A
    /// path in Windows' `\\?\`-prefixed extended-length form (returned
    /// once the cwd exceeds the platform's default length limit) is
    /// shortened back to its ordinary form first, so the wire never
    /// carries the verbatim prefix.
    pub fn cwd(&self) -> std::io::Result<String> {
        let path = std::env::current_dir()?;
        Ok(shorten_extended_length(&path.to_string_lossy()))
    }

    /// `KEY=VALUE` environment entries, in process order.
    pub fn env(&self) -> Vec<String> {
        std::env::vars()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }
}

/// Strips a `\\?\` or `\\?\UNC\` extended-length prefix, if present,
/// leaving everything else untouched. A no-op for any path that never had
/// one, which covers every non-Windows cwd.
fn shorten_extended_length(path: &str) -> String {
    if let Some(rest) = path.strip_prefix(r"\\?\UNC\") {
        format!(r"\\{rest}")
    } else if let Some(rest) = path.strip_prefix(r"\\?\") {
        rest.to_string()
    } else {
        path.to_string()
    }
}
