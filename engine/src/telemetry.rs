//! Tracing setup for hosts embedding the engine

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Production emits JSON lines, development pretty
/// output. Returns `false` when the host already installed a subscriber.
pub fn init_tracing() -> bool {
    let production = AppConfig::is_production();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if production {
            "fitlog_engine=info".into()
        } else {
            "fitlog_engine=debug,reqwest=info".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if production {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .is_ok()
    } else {
        // Pretty logging for development
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .is_ok()
    }
}
