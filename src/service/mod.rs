pub mod notifications;
pub mod recognition_actor;

pub use notifications::NotificationPipeline;
pub use recognition_actor::{FeedKey, RecognitionHandle};
