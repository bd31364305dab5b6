use tracing_subscriber::{EnvFilter, fmt, prelude::*, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "forkswap=info,forkswap_eth=info,warn";

/// Console logging, `RUST_LOG` overrides the default filter
///
/// Safe to call more than once, only the first call installs the subscriber.
pub fn setup_tracing() {
   let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

   let console_layer = fmt::layer()
      .with_writer(std::io::stdout)
      .with_filter(filter);

   let _ = tracing_subscriber::registry()
      .with(console_layer)
      .try_init();
}
