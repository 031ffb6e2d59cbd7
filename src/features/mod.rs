pub mod command_channel;
pub mod snapshot;

pub use command_channel::{spawn_stdin_channel, ScrollSwitch};
pub use snapshot::{load_snapshot, Snapshot, SnapshotError, SnapshotWriter};
