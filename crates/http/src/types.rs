//! Wire types for the Peerza REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Authentication

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response of a successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Credential pair minted at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh exchange result; `refresh` is only present when the server rotates it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

// Users and skills

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Partial profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// The server expects the literal string `"true"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn bio(bio: impl Into<String>) -> Self {
        Self {
            bio: Some(bio.into()),
            ..Self::default()
        }
    }

    pub fn remove_avatar() -> Self {
        Self {
            remove_avatar: Some("true".to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SkillType {
    Teach,
    Learn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSkill {
    pub id: i64,
    #[serde(default)]
    pub user: Option<User>,
    pub skill: Skill,
    #[serde(default)]
    pub proficiency: Option<String>,
    pub skill_type: SkillType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSkill {
    pub skill_name: String,
    pub skill_type: SkillType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub user: User,
    #[serde(default)]
    pub skills: Vec<UserSkill>,
}

/// Generic `{"message": ...}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Generic `{"ok": true}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    #[serde(default)]
    pub ok: bool,
}

// Availability

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub id: i64,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAvailability {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

// Meetings and calls

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeetingStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

/// A meeting participant, sent either as a nested user or a bare id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Participant {
    User(User),
    Id(i64),
}

impl Participant {
    pub fn id(&self) -> i64 {
        match self {
            Self::User(user) => user.id,
            Self::Id(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub host: Participant,
    pub guest: Participant,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
    pub status: MeetingStatus,
    #[serde(default)]
    pub jitsi_room: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub guest_id: i64,
    #[serde(default)]
    pub topic: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Accept,
    Decline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingDecision {
    pub response: Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStarted {
    #[serde(default)]
    pub ok: bool,
    /// Missing when the server only acknowledges the call
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatus {
    pub active: bool,
    #[serde(default)]
    pub caller: Option<User>,
}

// Notifications

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub actor: Option<User>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// Chat

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: i64,
    pub receiver: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub peer: User,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
}

// Friends

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub id: i64,
    pub friend: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: i64,
    pub from_user: User,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestSent {
    #[serde(default)]
    pub ok: bool,
    pub request_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendDecision {
    pub action: Decision,
}

// Payments

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}
