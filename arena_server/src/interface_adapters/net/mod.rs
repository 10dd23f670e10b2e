// Network adapter modules split by client sockets vs operator HTTP routes.

pub mod client;
pub mod internal;

pub use client::{SerializerObserver, ws_handler};
pub use internal::list_rooms_handler;
