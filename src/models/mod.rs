pub mod events;
pub mod fuel_log;
pub mod notification_log;
pub mod reading;
pub mod theft_alert;

pub use events::{AlertEvent, RefinedData, RefinedReportEvent};
pub use fuel_log::FuelLog;
pub use notification_log::{NewNotificationLog, NotificationLog};
pub use reading::Reading;
pub use theft_alert::{AlertAction, AlertStatus, InvalidTransition, NewTheftAlert, TheftAlert};
