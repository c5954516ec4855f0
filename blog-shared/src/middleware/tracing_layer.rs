use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the default filter;
/// `json` switches to one JSON object per line for log shipping.
pub fn init_tracing(service_name: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(service_name));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }

    tracing::info!(service = service_name, json, "tracing initialized");
}

fn default_filter(service_name: &str) -> EnvFilter {
    let crate_target = service_name.replace('-', "_");
    EnvFilter::new(format!("info,{crate_target}=debug,tower_http=debug"))
}
