// ABOUTME: Seam between queue logic and the node's player endpoints
// ABOUTME: Implemented by the REST client; tests substitute a recording controller

use async_trait::async_trait;

use crate::model::player::UpdatePlayer;
use crate::rest::RestClient;
use crate::Result;

/// Sends player commands to the node
#[async_trait]
pub trait PlayerController: Send + Sync {
    /// Apply a partial player update
    async fn update_player(&self, guild_id: u64, update: UpdatePlayer) -> Result<()>;

    /// Destroy the guild's player
    async fn destroy_player(&self, guild_id: u64) -> Result<()>;
}

#[async_trait]
impl PlayerController for RestClient {
    async fn update_player(&self, guild_id: u64, update: UpdatePlayer) -> Result<()> {
        RestClient::update_player(self, guild_id, &update).await?;
        Ok(())
    }

    async fn destroy_player(&self, guild_id: u64) -> Result<()> {
        RestClient::destroy_player(self, guild_id).await
    }
}
