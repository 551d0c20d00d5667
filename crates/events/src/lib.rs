//! CareCircle notification engine.
//!
//! This crate decides whether, how, and when a domain event reaches a user:
//!
//! - [`NotificationStore`]: persistence seam, with [`PgNotificationStore`]
//!   for production and [`InMemoryNotificationStore`] for tests and local
//!   development.
//! - [`PreferenceResolver`] / [`DeliveryDecisionEngine`]: per-user channel
//!   and type switches plus email quiet hours.
//! - [`EventFanoutPlanner`]: expands one forum event into de-duplicated
//!   per-recipient notifications.
//! - [`NotificationDispatcher`]: persists, gates, and delivers.
//! - [`SourceReadReconciler`]: bulk "mark read by source" with a single
//!   unread-count rebroadcast.
//! - [`delivery`]: the `Broadcaster` and `EmailSender` capabilities and the
//!   SMTP transport.
//! - [`CleanupSweeper`]: periodic expiry and read-retention cleanup.

pub mod config;
pub mod decision;
pub mod delivery;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod preferences;
pub mod reconciler;
pub mod store;
pub mod sweep;

pub use config::NotificationConfig;
pub use decision::{Clock, Decision, DeliveryDecisionEngine, SuppressReason};
pub use delivery::email::{EmailConfig, SmtpEmailSender};
pub use delivery::{
    Broadcaster, DeliveryContext, EmailReceipt, EmailSender, OutboundEmail, SenderContext,
};
pub use directory::{ForumDirectory, UserContact, UserDirectory};
pub use dispatcher::{ChannelOutcome, DispatchResult, FanoutDelivery, NotificationDispatcher};
pub use error::{DeliveryChannelError, LookupError, NotifyError, StoreError};
pub use fanout::{EventFanoutPlanner, FanoutEvent, PlannedNotification, RecipientRole};
pub use preferences::PreferenceResolver;
pub use reconciler::{MarkReadOutcome, SourceReadReconciler};
pub use store::memory::InMemoryNotificationStore;
pub use store::postgres::PgNotificationStore;
pub use store::{MarkReadStatus, NotificationStore};
pub use sweep::{CleanupSweeper, SweepReport};
