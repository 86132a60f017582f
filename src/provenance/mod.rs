pub mod compactor;
pub mod diagnostics;
pub mod file_tree;
pub mod line_ownership;
pub mod message;
pub mod operation;
pub mod replay;
pub mod sequencer;
pub mod session;
