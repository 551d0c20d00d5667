mod notification_preference_repo;
mod notification_repo;

pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::NotificationRepo;
