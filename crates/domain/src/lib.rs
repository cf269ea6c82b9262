pub mod config;
pub mod error;
pub mod policy;
pub mod render;
pub mod run_state;
pub mod turn;

pub use config::Config;
pub use error::{Error, Result};
pub use policy::ToolPolicy;
pub use render::{AnnotatedImage, RenderAction, RenderJob};
pub use run_state::{HealthResponse, RunState};
pub use turn::{ToolCall, Turn, TurnEvent, TurnLatency, TurnUsage};
