//! Account engagement: mention replies and keyword likes.

mod like;
mod reply;

pub use like::LikeHandler;
pub use reply::{ReplyHandler, ReplyReport, ReplyState};
