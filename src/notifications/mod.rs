pub mod channels;
pub mod dispatcher;
pub mod scheduler;

pub use dispatcher::Dispatcher;
pub use scheduler::{plan_day, AlarmBackend, NotificationScheduler};
