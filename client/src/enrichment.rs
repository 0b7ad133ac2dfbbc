use crate::error::EnrichmentError;
use async_trait::async_trait;
use shared::EnrichedPlayer;
use std::path::Path;

/// Loads player and tribe details from a server's save directory.
#[async_trait]
pub trait PlayerDetailsSource: Send + Sync {
    async fn load_players(&self, save_path: &Path) -> Result<Vec<EnrichedPlayer>, EnrichmentError>;
}
