//! CLI commands

use crate::config::CliConfig;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use peerza_http::PeerzaClient;
use peerza_http::types::{
    Decision, MeetingRequest, NewAvailability, ProfileUpdate, RegisterRequest, SkillType,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "PEERZA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PEERZA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Change your password
    Password {
        #[arg(long, env = "PEERZA_PASSWORD", hide_env_values = true)]
        old: String,
        #[arg(long, env = "PEERZA_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },

    /// Manage the skills you teach or want to learn
    Skills {
        #[command(subcommand)]
        command: SkillCommands,
    },

    /// Find peers who teach a skill
    Search { skill: String },

    /// Show another user's profile
    User { id: i64 },

    /// Manage weekly availability
    Availability {
        #[command(subcommand)]
        command: AvailabilityCommands,
    },

    /// Schedule meetings
    Meetings {
        #[command(subcommand)]
        command: MeetingCommands,
    },

    /// Classroom calls
    Call {
        #[command(subcommand)]
        command: CallCommands,
    },

    /// Read notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },

    /// Direct messages
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },

    /// Friends and friend requests
    Friends {
        #[command(subcommand)]
        command: FriendCommands,
    },

    /// Upgrade to Pro
    Pro {
        #[command(subcommand)]
        command: ProCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    Show,
    SetBio { bio: String },
    /// Upload a new avatar image
    SetAvatar { path: PathBuf },
    RemoveAvatar,
}

#[derive(Subcommand)]
pub enum SkillCommands {
    List,
    Add {
        name: String,
        #[arg(long, value_enum, default_value = "teach")]
        kind: SkillKind,
    },
    Remove { id: i64 },
}

#[derive(Clone, Debug, ValueEnum)]
pub enum SkillKind {
    Teach,
    Learn,
}

impl From<SkillKind> for SkillType {
    fn from(kind: SkillKind) -> Self {
        match kind {
            SkillKind::Teach => SkillType::Teach,
            SkillKind::Learn => SkillType::Learn,
        }
    }
}

#[derive(Subcommand)]
pub enum AvailabilityCommands {
    List,
    Add {
        /// Day of the week, e.g. monday
        day: String,
        /// Start time, HH:MM
        start: String,
        /// End time, HH:MM
        end: String,
    },
    Remove { id: i64 },
    /// Show a peer's slots and which are already booked
    Peer { id: i64 },
}

#[derive(Subcommand)]
pub enum MeetingCommands {
    List,
    Pending,
    Request {
        guest: i64,
        /// RFC 3339 start time
        #[arg(long)]
        start: DateTime<Utc>,
        /// RFC 3339 end time
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long, default_value = "")]
        topic: String,
    },
    Respond {
        id: i64,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
}

#[derive(Clone, Debug, ValueEnum)]
pub enum DecisionArg {
    Accept,
    Decline,
}

impl From<DecisionArg> for Decision {
    fn from(decision: DecisionArg) -> Self {
        match decision {
            DecisionArg::Accept => Decision::Accept,
            DecisionArg::Decline => Decision::Decline,
        }
    }
}

#[derive(Subcommand)]
pub enum CallCommands {
    Start { peer: i64 },
    End { peer: i64 },
    Check,
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    List,
    Read { id: i64 },
    ReadAll,
    /// Print new notifications as they arrive
    Watch,
}

#[derive(Subcommand)]
pub enum ChatCommands {
    List,
    Show { peer: i64 },
    Send { peer: i64, message: String },
    Read { peer: i64 },
    /// Print new messages from a conversation as they arrive
    Watch { peer: i64 },
}

#[derive(Subcommand)]
pub enum FriendCommands {
    List,
    Requests,
    Add {
        user: i64,
    },
    Respond {
        id: i64,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
}

#[derive(Subcommand)]
pub enum ProCommands {
    /// Open a checkout session and print its id
    Checkout,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Commands {
    pub async fn execute(self, client: &PeerzaClient, config: &CliConfig) -> Result<()> {
        match self {
            Commands::Login { username, password } => {
                client
                    .login(&username, password)
                    .await
                    .context("login failed")?;
                info!("Logged in as {username}");
                println!("Logged in as {username}");
                Ok(())
            }
            Commands::Register {
                username,
                email,
                password,
            } => {
                let user = client
                    .register(RegisterRequest {
                        username,
                        email,
                        password,
                    })
                    .await?;
                println!("Registered {}. Run `peerza login` to sign in.", user.username);
                Ok(())
            }
            Commands::Logout => {
                client.logout()?;
                println!("Logged out");
                Ok(())
            }
            Commands::Profile { command } => command.execute(client).await,
            Commands::Password { old, new } => {
                let response = client.change_password(old, new).await?;
                println!(
                    "{}",
                    response
                        .message
                        .unwrap_or_else(|| "Password updated".to_string())
                );
                Ok(())
            }
            Commands::Skills { command } => command.execute(client).await,
            Commands::Search { skill } => print_json(&client.search_peers(&skill).await?),
            Commands::User { id } => print_json(&client.public_profile(id).await?),
            Commands::Availability { command } => command.execute(client).await,
            Commands::Meetings { command } => command.execute(client).await,
            Commands::Call { command } => command.execute(client).await,
            Commands::Notifications { command } => command.execute(client, config).await,
            Commands::Chat { command } => command.execute(client, config).await,
            Commands::Friends { command } => command.execute(client).await,
            Commands::Pro { command } => command.execute(client).await,
        }
    }
}

impl ProfileCommands {
    pub async fn execute(self, client: &PeerzaClient) -> Result<()> {
        let profile = match self {
            ProfileCommands::Show => client.profile().await?,
            ProfileCommands::SetBio { bio } => {
                client.update_profile(&ProfileUpdate::bio(bio)).await?
            }
            ProfileCommands::SetAvatar { path } => client.update_avatar(&path).await?,
            ProfileCommands::RemoveAvatar => {
                client
                    .update_profile(&ProfileUpdate::remove_avatar())
                    .await?
            }
        };
        print_json(&profile)
    }
}

impl SkillCommands {
    pub async fn execute(self, client: &PeerzaClient) -> Result<()> {
        match self {
            SkillCommands::List => print_json(&client.my_skills().await?),
            SkillCommands::Add { name, kind } => {
                let response = client.add_skill(name, kind.into()).await?;
                println!(
                    "{}",
                    response.message.unwrap_or_else(|| "Skill added".to_string())
                );
                Ok(())
            }
            SkillCommands::Remove { id } => {
                client.delete_skill(id).await?;
                println!("Skill {id} removed");
                Ok(())
            }
        }
    }
}

impl AvailabilityCommands {
    pub async fn execute(self, client: &PeerzaClient) -> Result<()> {
        match self {
            AvailabilityCommands::List => print_json(&client.my_availability().await?),
            AvailabilityCommands::Add { day, start, end } => {
                let slot = client
                    .add_availability(NewAvailability {
                        day_of_week: day,
                        start_time: start,
                        end_time: end,
                    })
                    .await?;
                print_json(&slot)
            }
            AvailabilityCommands::Remove { id } => {
                client.remove_availability(id).await?;
                println!("Slot {id} removed");
                Ok(())
            }
            AvailabilityCommands::Peer { id } => print_json(&client.peer_availability(id).await?),
        }
    }
}

impl MeetingCommands {
    pub async fn execute(self, client: &PeerzaClient) -> Result<()> {
        match self {
            MeetingCommands::List => print_json(&client.meetings().await?),
            MeetingCommands::Pending => print_json(&client.pending_meetings().await?),
            MeetingCommands::Request {
                guest,
                start,
                end,
                topic,
            } => {
                let meeting = client
                    .request_meeting(&MeetingRequest {
                        guest_id: guest,
                        topic,
                        start_datetime: start,
                        end_datetime: end,
                    })
                    .await?;
                print_json(&meeting)
            }
            MeetingCommands::Respond { id, decision } => {
                print_json(&client.respond_meeting(id, decision.into()).await?)
            }
        }
    }
}

impl CallCommands {
    pub async fn execute(self, client: &PeerzaClient) -> Result<()> {
        match self {
            CallCommands::Start { peer } => {
                let call = client.start_call(peer).await?;
                match call.room {
                    Some(room) => println!("Join room {room}"),
                    None => println!(
                        "{}",
                        call.message.as_deref().unwrap_or("Call started")
                    ),
                }
                Ok(())
            }
            CallCommands::End { peer } => {
                client.end_call(peer).await?;
                println!("Call ended");
                Ok(())
            }
            CallCommands::Check => print_json(&client.check_calls().await?),
        }
    }
}

impl NotificationCommands {
    pub async fn execute(self, client: &PeerzaClient, config: &CliConfig) -> Result<()> {
        match self {
            NotificationCommands::List => print_json(&client.notifications().await?),
            NotificationCommands::Read { id } => {
                client.mark_notification_read(id).await?;
                Ok(())
            }
            NotificationCommands::ReadAll => {
                client.mark_all_notifications_read().await?;
                Ok(())
            }
            NotificationCommands::Watch => {
                let cancel = cancel_on_ctrl_c();
                let mut updates = client
                    .poll_notifications(Some(config.notification_poll_interval()), cancel);

                let mut seen = HashSet::new();
                while let Some(update) = updates.recv().await {
                    match update {
                        Ok(notifications) => {
                            for notification in notifications {
                                if seen.insert(notification.id) {
                                    print_json(&notification)?;
                                }
                            }
                        }
                        Err(e) if e.is_session_expired() => return Err(e.into()),
                        Err(e) => warn!("Failed to fetch notifications: {e}"),
                    }
                }
                Ok(())
            }
        }
    }
}

impl ChatCommands {
    pub async fn execute(self, client: &PeerzaClient, config: &CliConfig) -> Result<()> {
        match self {
            ChatCommands::List => print_json(&client.conversations().await?),
            ChatCommands::Show { peer } => print_json(&client.messages(peer).await?),
            ChatCommands::Send { peer, message } => {
                print_json(&client.send_message(peer, message).await?)
            }
            ChatCommands::Read { peer } => {
                client.mark_chat_read(peer).await?;
                Ok(())
            }
            ChatCommands::Watch { peer } => {
                let cancel = cancel_on_ctrl_c();
                let mut updates =
                    client.poll_messages(peer, Some(config.chat_poll_interval()), cancel);

                let mut last_seen = None;
                while let Some(update) = updates.recv().await {
                    match update {
                        Ok(messages) => {
                            for message in messages {
                                if last_seen.is_none_or(|id| message.id > id) {
                                    println!(
                                        "[{}] {}: {}",
                                        message.timestamp.format("%H:%M"),
                                        message.sender,
                                        message.content
                                    );
                                    last_seen = Some(message.id);
                                }
                            }
                        }
                        Err(e) if e.is_session_expired() => return Err(e.into()),
                        Err(e) => warn!("Failed to fetch messages: {e}"),
                    }
                }
                Ok(())
            }
        }
    }
}

impl FriendCommands {
    pub async fn execute(self, client: &PeerzaClient) -> Result<()> {
        match self {
            FriendCommands::List => print_json(&client.friends().await?),
            FriendCommands::Requests => print_json(&client.friend_requests().await?),
            FriendCommands::Add { user } => {
                let sent = client.send_friend_request(user).await?;
                println!("Friend request {} sent", sent.request_id);
                Ok(())
            }
            FriendCommands::Respond { id, decision } => {
                let ack = client.respond_friend_request(id, decision.into()).await?;
                if !ack.ok {
                    bail!("server did not confirm the response");
                }
                Ok(())
            }
        }
    }
}

impl ProCommands {
    pub async fn execute(self, client: &PeerzaClient) -> Result<()> {
        match self {
            ProCommands::Checkout => {
                let session = client.create_checkout_session().await?;
                println!("{}", session.session_id);
                Ok(())
            }
        }
    }
}

/// Token that fires when the user presses Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}
