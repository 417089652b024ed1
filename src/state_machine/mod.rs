mod request;
mod state;

pub use request::{MediaRequest, MediaType, NewMediaRequest, RequestId, TargetPlatform, excerpt};
pub use state::{Command, RequestStatus, TransitionPolicy};
