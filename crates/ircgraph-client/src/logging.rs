use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "ircgraph_client=debug,ircgraph_net=debug,ircgraph_store=info,warn";

/// Install the fmt subscriber, honouring `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already set, which is fine for
/// hosts and tests that call this more than once.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        assert!(!init());
    }
}
