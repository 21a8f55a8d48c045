// [libs/domain/models/src/lib.rs]

pub mod change;
pub mod config;
pub mod deployment;
pub mod errors;
pub mod heartbeat;
pub mod machine;
pub mod phase;
pub mod state;

pub use change::ChangeEvent;
pub use config::{default_network_cidr, Config, CorrosionSettings, ResolvedConfig};
pub use deployment::{ContainerRow, DeploymentRow};
pub use errors::ModelError;
pub use heartbeat::HeartbeatRow;
pub use machine::{MachineRow, Peer};
pub use phase::Phase;
pub use state::State;
