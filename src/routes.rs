mod api_json;
mod health_check;
mod login;
mod logout;
mod overview;

pub use api_json::*;
pub use health_check::*;
pub use login::*;
pub use logout::*;
pub use overview::*;
