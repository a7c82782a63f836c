//! Resource Lifecycle Engine
//!
//! Per-account operations over the [`Store`] that enforce uniqueness and
//! quota rules before persisting, and that run cascades as explicit steps
//! inside the owning operation:
//!
//! - terminating an instance releases its volumes, clears its address
//!   association and drops its group memberships, then removes the row
//! - deleting a security group drops its memberships
//! - associating an address first clears any other address on that instance
//!
//! Every operation either completes or fails before touching the store.

use chrono::Utc;

use crate::config::{Config, DoubleAttachPolicy, UnknownGroupPolicy};
use crate::error::AwsError;
use crate::ids;
use crate::store::{
    AccountId, Address, Instance, InstanceState, Keypair, SecurityGroup, SerialId, Snapshot,
    SnapshotStatus, Store, Volume, VolumeStatus,
};

/// Security group every account gets at registration
pub const DEFAULT_GROUP_NAME: &str = "default";
pub const DEFAULT_GROUP_DESCRIPTION: &str = "default group";

/// Provider state code for a running instance
const RUNNING_STATE_CODE: &str = "16";

/// Longest accepted user data, in bytes
pub const MAX_USER_DATA_LEN: usize = 4096;

/// Parameters for an instance launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams {
    /// Accepted for signature compatibility; one instance is launched per call
    pub min_count: u32,
    pub max_count: u32,
    /// Security group names; defaults to `["default"]`
    pub group_ids: Vec<String>,
    pub key_name: Option<String>,
    pub user_data: String,
    pub addressing_type: Option<String>,
    pub instance_type: Option<String>,
    /// Generated when absent
    pub kernel_id: Option<String>,
    /// Generated when absent
    pub ramdisk_id: Option<String>,
    pub availability_zone: Option<String>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            min_count: 1,
            max_count: 1,
            group_ids: vec![DEFAULT_GROUP_NAME.to_string()],
            key_name: None,
            user_data: String::new(),
            addressing_type: None,
            instance_type: None,
            kernel_id: None,
            ramdisk_id: None,
            availability_zone: None,
        }
    }
}

impl LaunchParams {
    /// Replace the default group list; an empty list joins no groups
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_ids = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn with_user_data(mut self, user_data: impl Into<String>) -> Self {
        self.user_data = user_data.into();
        self
    }

    pub fn with_availability_zone(mut self, zone: impl Into<String>) -> Self {
        self.availability_zone = Some(zone.into());
        self
    }
}

/// Lifecycle operations for one authenticated account
pub struct Lifecycle<'a> {
    store: &'a mut Store,
    config: &'a Config,
    account: AccountId,
}

impl<'a> Lifecycle<'a> {
    pub fn new(store: &'a mut Store, config: &'a Config, account: AccountId) -> Self {
        Self {
            store,
            config,
            account,
        }
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Read access for rendering results
    pub fn store(&self) -> &Store {
        self.store
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Allocate an elastic IP, bounded by the live per-account count
    pub fn allocate_address(&mut self) -> Result<String, AwsError> {
        let held = self.store.addresses(self.account).count();
        if held >= self.config.address_limit {
            tracing::warn!(
                "Address limit reached for account {} ({}/{})",
                self.account,
                held,
                self.config.address_limit
            );
            return Err(AwsError::address_limit());
        }

        // Values are global; draw again on a collision with any account
        let value = loop {
            let candidate = ids::random_ip();
            let inserted = self.store.insert_address(Address {
                value: candidate.clone(),
                account: self.account,
                instance: None,
            });
            if inserted {
                break candidate;
            }
            tracing::debug!("Address {} already allocated, drawing another", candidate);
        };

        tracing::info!("Allocated address {} for account {}", value, self.account);
        Ok(value)
    }

    /// Release an elastic IP owned by the account
    pub fn release_address(&mut self, public_ip: &str) -> Result<(), AwsError> {
        if self.store.remove_address(self.account, public_ip).is_none() {
            tracing::warn!("Refusing to release foreign address {}", public_ip);
            return Err(AwsError::address_not_owned(public_ip));
        }

        tracing::info!("Released address {}", public_ip);
        Ok(())
    }

    /// Associate an owned address with an owned instance
    pub fn associate_address(
        &mut self,
        instance_id: &str,
        public_ip: &str,
    ) -> Result<(), AwsError> {
        if self.store.instance(self.account, instance_id).is_none() {
            return Err(AwsError::instance_not_found(instance_id));
        }
        if self.store.address(self.account, public_ip).is_none() {
            return Err(AwsError::address_not_owned(public_ip));
        }

        // An instance holds at most one address
        self.store.clear_address_associations(instance_id);

        if let Some(address) = self.store.address_mut(self.account, public_ip) {
            address.instance = Some(instance_id.to_string());
        }

        tracing::info!("Associated {} with {}", public_ip, instance_id);
        Ok(())
    }

    /// Clear an owned address's instance association
    pub fn disassociate_address(&mut self, public_ip: &str) -> Result<(), AwsError> {
        let Some(address) = self.store.address_mut(self.account, public_ip) else {
            return Err(AwsError::address_not_owned(public_ip));
        };

        address.instance = None;
        tracing::info!("Disassociated {}", public_ip);
        Ok(())
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Launch one instance and join it to the requested security groups
    ///
    /// Returns the new instance id.
    pub fn launch_instance(
        &mut self,
        image_id: &str,
        params: &LaunchParams,
    ) -> Result<String, AwsError> {
        if params.user_data.len() > MAX_USER_DATA_LEN {
            tracing::warn!(
                "Rejecting launch with {} bytes of user data",
                params.user_data.len()
            );
            return Err(AwsError::user_data_too_large(
                params.user_data.len(),
                MAX_USER_DATA_LEN,
            ));
        }

        let keypair = match params.key_name.as_deref() {
            Some(name) => match self.store.keypair_by_name(self.account, name) {
                Some(keypair) => Some(keypair.id),
                None => {
                    tracing::warn!("Launch references missing keypair '{}'", name);
                    return Err(AwsError::keypair_not_found(name));
                },
            },
            None => None,
        };

        let groups = self.resolve_groups(&params.group_ids)?;

        let instance = Instance {
            id: ids::prefixed(ids::INSTANCE_PREFIX),
            account: self.account,
            image_id: image_id.to_string(),
            instance_type: params
                .instance_type
                .clone()
                .unwrap_or_else(|| self.config.default_instance_type.clone()),
            reservation_id: ids::prefixed(ids::RESERVATION_PREFIX),
            state: InstanceState::Running,
            reason: String::new(),
            state_code: RUNNING_STATE_CODE.to_string(),
            dns_name: None,
            private_dns_name: ids::private_dns_name(),
            kernel_id: params
                .kernel_id
                .clone()
                .unwrap_or_else(|| ids::prefixed(ids::KERNEL_PREFIX)),
            ramdisk_id: params
                .ramdisk_id
                .clone()
                .unwrap_or_else(|| ids::prefixed(ids::RAMDISK_PREFIX)),
            launch_time: Utc::now().format("%Y-%m-%dT%H:%M:%S.000Z").to_string(),
            addressing_type: params
                .addressing_type
                .clone()
                .unwrap_or_else(|| self.config.default_addressing_type.clone()),
            availability_zone: params.availability_zone.clone(),
            user_data: params.user_data.clone(),
            keypair,
        };

        let id = instance.id.clone();
        self.store.insert_instance(instance);
        for group in groups {
            self.store.add_membership(&id, group);
        }

        tracing::info!("Launched {} from {} for account {}", id, image_id, self.account);
        Ok(id)
    }

    /// Map group names to owned group ids, applying the unknown-group policy
    fn resolve_groups(&self, names: &[String]) -> Result<Vec<SerialId>, AwsError> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            match self.store.security_group_by_name(self.account, name) {
                Some(group) => resolved.push(group.id),
                None => match self.config.unknown_group_policy {
                    UnknownGroupPolicy::Skip => {
                        tracing::debug!("Skipping unknown security group '{}'", name);
                    },
                    UnknownGroupPolicy::Reject => {
                        tracing::warn!("Launch references missing security group '{}'", name);
                        return Err(AwsError::group_not_found(name));
                    },
                },
            }
        }
        Ok(resolved)
    }

    /// Terminate one instance, running its cascades first
    ///
    /// Returns the removed row, or `None` when the account has no such
    /// instance.
    pub fn terminate_instance(&mut self, instance_id: &str) -> Option<Instance> {
        self.store.instance(self.account, instance_id)?;

        let released = self.release_attached_volumes(instance_id);
        let cleared = self.store.clear_address_associations(instance_id);
        self.store.remove_instance_memberships(instance_id);

        let instance = self.store.remove_instance(self.account, instance_id)?;
        tracing::info!(
            "Terminated {} (released {} volume(s), {} address(es))",
            instance_id,
            released,
            cleared
        );
        Some(instance)
    }

    /// Detach every volume attached to an instance; returns how many
    fn release_attached_volumes(&mut self, instance_id: &str) -> usize {
        let attached = self.store.volumes_attached_to(instance_id);
        for volume_id in &attached {
            if let Some(volume) = self.store.volume_mut(self.account, volume_id) {
                volume.instance = None;
                volume.attached_at = None;
                volume.status = VolumeStatus::Available;
            }
        }
        attached.len()
    }

    // =========================================================================
    // Volumes
    // =========================================================================

    /// Create a volume in the `creating` state
    pub fn create_volume(
        &mut self,
        snapshot_id: Option<&str>,
        size: Option<u32>,
        zone: Option<&str>,
    ) -> Volume {
        let volume = Volume {
            id: ids::prefixed(ids::VOLUME_PREFIX),
            account: self.account,
            snapshot_id: snapshot_id.map(str::to_string),
            status: VolumeStatus::Creating,
            zone: zone.map(str::to_string),
            created_at: Utc::now(),
            size,
            device: None,
            attached_at: None,
            instance: None,
        };

        tracing::info!("Created volume {} for account {}", volume.id, self.account);
        self.store.insert_volume(volume.clone());
        volume
    }

    /// Delete a volume; `None` when the account has no such volume
    pub fn delete_volume(&mut self, volume_id: &str) -> Option<Volume> {
        let volume = self.store.remove_volume(self.account, volume_id)?;
        tracing::info!("Deleted volume {}", volume_id);
        Some(volume)
    }

    /// Attach a volume to an instance at `device`
    pub fn attach_volume(
        &mut self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<(), AwsError> {
        let Some(volume) = self.store.volume(self.account, volume_id) else {
            return Err(AwsError::volume_not_found(volume_id));
        };
        let already_attached = volume.instance.is_some();

        if self.store.instance(self.account, instance_id).is_none() {
            return Err(AwsError::instance_not_found(instance_id));
        }

        if already_attached {
            match self.config.double_attach_policy {
                DoubleAttachPolicy::Overwrite => {
                    tracing::debug!("Re-attaching {} to {}", volume_id, instance_id);
                },
                DoubleAttachPolicy::Reject => {
                    tracing::warn!("Refusing to re-attach {}", volume_id);
                    return Err(AwsError::volume_in_use(volume_id));
                },
            }
        }

        if let Some(volume) = self.store.volume_mut(self.account, volume_id) {
            volume.instance = Some(instance_id.to_string());
            volume.device = Some(device.to_string());
            volume.attached_at = Some(Utc::now());
            volume.status = VolumeStatus::Attached;
        }

        tracing::info!("Attached {} to {} at {}", volume_id, instance_id, device);
        Ok(())
    }

    /// Detach a volume; detaching a detached volume is not an error
    pub fn detach_volume(&mut self, volume_id: &str) -> Result<(), AwsError> {
        let Some(volume) = self.store.volume_mut(self.account, volume_id) else {
            return Err(AwsError::volume_not_found(volume_id));
        };

        volume.instance = None;
        volume.attached_at = None;
        volume.status = VolumeStatus::Available;

        tracing::info!("Detached {}", volume_id);
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Record a snapshot of `volume_id`; the volume is not looked up
    pub fn create_snapshot(&mut self, volume_id: &str) -> Snapshot {
        let snapshot = Snapshot {
            id: ids::prefixed(ids::SNAPSHOT_PREFIX),
            account: self.account,
            volume_id: volume_id.to_string(),
            status: SnapshotStatus::Completed,
            progress: "100%".to_string(),
            started_at: Utc::now(),
        };

        tracing::info!("Created snapshot {} of {}", snapshot.id, volume_id);
        self.store.insert_snapshot(snapshot.clone());
        snapshot
    }

    pub fn delete_snapshot(&mut self, snapshot_id: &str) -> Option<Snapshot> {
        let snapshot = self.store.remove_snapshot(self.account, snapshot_id)?;
        tracing::info!("Deleted snapshot {}", snapshot_id);
        Some(snapshot)
    }

    // =========================================================================
    // Security groups
    // =========================================================================

    /// Create a group; names are unique per account
    pub fn create_security_group(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<SerialId, AwsError> {
        if self.store.security_group_by_name(self.account, name).is_some() {
            tracing::warn!("Duplicate security group '{}'", name);
            return Err(AwsError::duplicate_group(name));
        }

        let id = self.store.next_serial();
        self.store.insert_security_group(SecurityGroup {
            id,
            account: self.account,
            name: name.to_string(),
            description: description.to_string(),
        });

        tracing::info!("Created security group '{}' for account {}", name, self.account);
        Ok(id)
    }

    /// Delete a group by name; `false` when the account has no such group
    pub fn delete_security_group(&mut self, name: &str) -> bool {
        let Some(id) = self
            .store
            .security_group_by_name(self.account, name)
            .map(|g| g.id)
        else {
            return false;
        };

        self.store.remove_group_memberships(id);
        self.store.remove_security_group(id);
        tracing::info!("Deleted security group '{}'", name);
        true
    }

    // =========================================================================
    // Keypairs
    // =========================================================================

    /// Create a keypair; names are unique per account
    pub fn create_keypair(&mut self, name: &str) -> Result<Keypair, AwsError> {
        if self.store.keypair_by_name(self.account, name).is_some() {
            tracing::warn!("Duplicate keypair '{}'", name);
            return Err(AwsError::duplicate_keypair(name));
        }

        let keypair = Keypair {
            id: self.store.next_serial(),
            account: self.account,
            name: name.to_string(),
        };
        self.store.insert_keypair(keypair.clone());

        tracing::info!("Created keypair '{}' for account {}", name, self.account);
        Ok(keypair)
    }

    pub fn delete_keypair(&mut self, name: &str) -> Result<(), AwsError> {
        let Some(id) = self.store.keypair_by_name(self.account, name).map(|k| k.id) else {
            return Err(AwsError::keypair_not_found(name));
        };

        self.store.remove_keypair(id);
        tracing::info!("Deleted keypair '{}'", name);
        Ok(())
    }
}
