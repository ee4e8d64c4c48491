//! Progress reporting for the CLI
//!
//! Upload progress from the core library travels over a channel to a
//! renderer task that draws indicatif bars.

pub mod provider;
pub mod renderer;
pub mod utils;

pub use provider::{ChannelProvider, create_progress_infrastructure};
pub use renderer::render_progress;
pub use utils::{format_bytes, format_duration};
