pub mod catalog;
pub mod collection;
pub mod error;
pub mod grant;
pub mod notify;
pub mod roller;
pub mod scheduler;
pub mod template;

pub use catalog::RewardCatalog;
pub use error::{CatalogError, GrantError, NotifyError};
pub use grant::RewardGrantService;
pub use notify::{LogNotifier, Notifier, PacketNotice, WebhookNotifier};
pub use roller::RewardRoller;
pub use scheduler::{DailyGrantScheduler, RunReport, SchedulerConfig};
