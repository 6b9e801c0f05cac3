mod access_level;
mod actor_email;
mod mobile_number;
mod nick;
mod post_message;
mod privacy;

pub use access_level::AccessLevel;
pub use actor_email::ActorEmail;
pub use mobile_number::MobileNumber;
pub use nick::{Nick, NickKind};
pub use post_message::PostMessage;
pub use privacy::Privacy;
