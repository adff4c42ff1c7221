pub mod intent;
pub mod observation;
pub mod preferences;
pub mod slot;
pub mod task;

pub use intent::{CriticalFields, Intent, Priority, TaskType};
pub use observation::Observation;
pub use preferences::{DeadlineBehavior, Flexibility, UserPreferences};
pub use slot::Slot;
pub use task::Task;
