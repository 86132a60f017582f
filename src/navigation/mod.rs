pub mod coordinator;
pub mod deep_link;
pub mod events;
pub mod window;
pub mod xref;
