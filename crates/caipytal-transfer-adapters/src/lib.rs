pub mod clock;
pub mod commit;
pub mod config;
pub mod countdown;
pub mod notifier;
pub mod session;

pub use clock::SystemClockAdapter;
pub use commit::{HttpCommitAdapter, SimulatedCommitAdapter};
pub use config::TransferAdapterConfig;
pub use countdown::{CountdownTick, TokioCountdown};
pub use notifier::{ChannelNotifier, FlowNotification};
pub use session::{SessionOrchestrator, TransferSession};
