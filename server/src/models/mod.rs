pub mod category;
pub mod comment;
pub mod event;
pub mod user;

pub use category::{Category, CategoryPayload};
pub use comment::{CommentChanges, CommentPayload, CommentRecord, CommentView, NewComment};
pub use event::{EventChanges, EventPayload, EventRecord, EventView, NewEvent};
pub use user::{NewUser, User, UserChanges, UserPayload, UserView};
