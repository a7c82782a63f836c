//! Entity types held by the store
//!
//! Fields use internal names; the provider's external names are applied by
//! [`crate::ec2::shape`] when a record is rendered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Serial id shared by keypairs and security groups
pub type SerialId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Instance state as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    #[default]
    Running,
    ShuttingDown,
    Terminated,
    Stopped,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub account: AccountId,
    pub image_id: String,
    pub instance_type: String,
    pub reservation_id: String,
    pub state: InstanceState,
    pub reason: String,
    pub state_code: String,
    pub dns_name: Option<String>,
    pub private_dns_name: String,
    pub kernel_id: String,
    pub ramdisk_id: String,
    pub launch_time: String,
    pub addressing_type: String,
    pub availability_zone: Option<String>,
    pub user_data: String,
    pub keypair: Option<SerialId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub value: String,
    pub account: AccountId,
    pub instance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    pub id: SerialId,
    pub account: AccountId,
    pub name: String,
}

/// Volume status; `creating → available ⇄ attached`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeStatus {
    Creating,
    Available,
    Attached,
}

impl VolumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Available => "available",
            Self::Attached => "attached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub id: String,
    pub account: AccountId,
    pub snapshot_id: Option<String>,
    pub status: VolumeStatus,
    pub zone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub size: Option<u32>,
    pub device: Option<String>,
    pub attached_at: Option<DateTime<Utc>>,
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub account: AccountId,
    /// Not checked against the volume table
    pub volume_id: String,
    pub status: SnapshotStatus,
    pub progress: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup {
    pub id: SerialId,
    pub account: AccountId,
    pub name: String,
    pub description: String,
}

/// Join row between an instance and a security group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceXSecurityGroup {
    pub instance_id: String,
    pub security_group_id: SerialId,
}
