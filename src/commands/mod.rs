pub mod build;
pub mod resolve;

use crate::error::BlameError;
use crate::provenance::message::Message;
use crate::provenance::operation::FileOperation;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Already-parsed session records, as read from JSON
#[derive(Debug, Deserialize)]
pub struct SessionInput {
    pub operations: Vec<FileOperation>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub context_ids: HashMap<String, String>,
}

pub fn load_session(path: &Path) -> Result<SessionInput, BlameError> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}
