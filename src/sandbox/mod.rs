pub mod frame;
pub mod message;

pub use frame::{Document, EmbeddedFrame};
pub use message::{window_channel, Mailbox, PostedMessage, WindowHandle, WindowId};
