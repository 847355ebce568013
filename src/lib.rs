pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::checker::UpdateDecision;
pub use crate::core::content::UpdateScope;
pub use crate::core::error::{UpdateError, UpdateResult};
pub use crate::core::progress::{ProgressReporter, ProgressUpdate};
pub use crate::core::remote::RemoteVersionDescriptor;
pub use crate::core::selfupdate::{RelaunchPending, UpdatePhase};
pub use crate::core::updater::Updater;

/// Initialize structured logging for binaries embedding this crate.
/// Honours `RUST_LOG`, defaulting to info with debug detail for the
/// updater itself.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,craftsync=debug")),
        )
        .init();
}
