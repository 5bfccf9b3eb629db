//! Logo generation seam.
//!
//! The batch runner only knows [`LogoGenerator`]; the HTTP implementation
//! renders through an image-generation endpoint addressed by prompt, seed and
//! size. Identical requests may still yield different bytes, so locators are
//! never cached here.

use async_trait::async_trait;

use crate::error::AppError;
use crate::http;

use super::prompt;
use super::team::Team;

/// Produces a locator for a freshly rendered logo of `team`.
#[async_trait]
pub trait LogoGenerator: Send + Sync {
    async fn generate(&self, team: &Team) -> Result<String, AppError>;
}

/// Generator backed by a Pollinations-style `GET /prompt/{text}` endpoint.
pub struct PollinationsGenerator {
    http: reqwest::Client,
    base_url: String,
    image_size: u32,
}

impl PollinationsGenerator {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, image_size: u32) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            image_size,
        }
    }

    /// Locator without contacting the endpoint.
    pub fn locator(&self, team: &Team) -> String {
        prompt::generation_url(&self.base_url, team, self.image_size)
    }
}

#[async_trait]
impl LogoGenerator for PollinationsGenerator {
    async fn generate(&self, team: &Team) -> Result<String, AppError> {
        let url = self.locator(team);
        tracing::debug!(team_id = %team.id, seed = team.seed, "Requesting logo render");

        // The endpoint renders on first GET; a success status means the image exists.
        http::send_checked(self.http.get(&url))
            .await
            .map_err(|e| AppError::Generation(format!("{}: {e}", team.name)))?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::team::demo_teams;

    #[test]
    fn test_locator_uses_configured_size() {
        let http = http::build_client(None).unwrap();
        let g = PollinationsGenerator::new(http, "https://img.test", 512);
        let team = demo_teams().remove(0);
        let url = g.locator(&team);
        assert!(url.starts_with("https://img.test/prompt/"));
        assert!(url.contains("width=512&height=512"));
        assert!(url.contains("seed=7123"));
    }
}
