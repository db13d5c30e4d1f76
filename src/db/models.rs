#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WatchedFolder {
    pub id: i64,
    pub path: String,
    pub active: bool,
}
