pub mod enums;
pub mod message;

pub use enums::{BoolOp, MatchMode};
pub use message::{MessageFlags, MessageRecord};
