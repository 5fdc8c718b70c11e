mod contact;
mod ids;
mod task;
mod user;

pub use contact::*;
pub use ids::*;
pub use task::*;
pub use user::*;
