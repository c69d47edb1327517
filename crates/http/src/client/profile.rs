//! Profile, skill and peer search methods

use super::{ApiRequest, ClientError, PeerzaClient};
use crate::types::{
    MessageResponse, NewSkill, ProfileUpdate, PublicProfile, SkillType, User, UserSkill,
};
use std::path::Path;

impl PeerzaClient {
    /// Get the logged-in user's profile
    pub async fn profile(&self) -> Result<User, ClientError> {
        self.execute(ApiRequest::get("/profile/")).await
    }

    /// Partially update the logged-in user's profile
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let req = ApiRequest::patch("/profile/").json(update)?;
        self.execute(req).await
    }

    /// Upload an avatar image, sent as a multipart PATCH of the profile
    pub async fn update_avatar(&self, path: impl AsRef<Path>) -> Result<User, ClientError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::InvalidInput(format!("not a file path: {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ClientError::InvalidInput(format!("cannot read {}: {err}", path.display()))
        })?;

        let mime = image_mime(path);
        let req = ApiRequest::patch("/profile/").file_part("avatar", file_name, mime, bytes);
        self.execute(req).await
    }

    /// Another user's profile together with their skills
    pub async fn public_profile(&self, user_id: i64) -> Result<PublicProfile, ClientError> {
        self.execute(ApiRequest::get(format!("/users/{user_id}/")))
            .await
    }

    pub async fn my_skills(&self) -> Result<Vec<UserSkill>, ClientError> {
        self.execute(ApiRequest::get("/my-skills/")).await
    }

    /// Add a skill. Free accounts are limited server-side and get `Forbidden`.
    pub async fn add_skill(
        &self,
        name: impl Into<String>,
        skill_type: SkillType,
    ) -> Result<MessageResponse, ClientError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ClientError::InvalidInput("skill name is empty".into()));
        }

        let req = ApiRequest::post("/my-skills/").json(&NewSkill {
            skill_name: name.trim().to_string(),
            skill_type,
        })?;
        self.execute(req).await
    }

    pub async fn delete_skill(&self, user_skill_id: i64) -> Result<(), ClientError> {
        self.execute_empty(ApiRequest::delete(format!(
            "/delete-skill/{user_skill_id}/"
        )))
        .await
    }

    /// Find peers who teach a skill matching `query`
    pub async fn search_peers(&self, query: &str) -> Result<Vec<UserSkill>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::InvalidInput(
                "provide a skill to search for".into(),
            ));
        }

        self.execute(ApiRequest::get("/search/").query("skill", query))
            .await
    }
}

fn image_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
