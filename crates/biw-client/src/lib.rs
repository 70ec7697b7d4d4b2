mod bi;
mod jobs;
mod platform;

pub use bi::BiApiClient;
pub use jobs::{QueueClient, SyncJobClient};
pub use platform::{PlatformClient, Service};
