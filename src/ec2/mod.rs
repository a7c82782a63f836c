//! EC2 API facade
//!
//! Provider-style verbs over one [`MockAws`] handle. Every call
//! authenticates the facade's credential pair, runs the operation through
//! the [`Lifecycle`] engine and renders the result into the records in
//! [`shape`].
//!
//! # Module Structure
//!
//! - [`shape`] - Response records per entity and representation mode
//! - [`dispatch`] - Verb-name dispatch over JSON parameters
//! - `unsupported` - Verbs the fake refuses, or accepts without effect
//!
//! # Example
//!
//! ```
//! use mockec2::MockAws;
//!
//! let aws = MockAws::default();
//! aws.register("hello", "world");
//! let ec2 = aws.ec2("hello", "world");
//!
//! let volume = ec2.create_volume(None, Some(10), Some("us-east-1a")).unwrap();
//! assert_eq!(ec2.describe_volumes(&[]).unwrap()[0].aws_id, volume.aws_id);
//! ```

pub mod dispatch;
pub mod shape;
mod unsupported;

pub use crate::lifecycle::LaunchParams;
pub use shape::{
    AddressRecord, AvailabilityZone, InstanceRecord, InstanceSummary, KeypairRecord,
    LaunchedInstance, SecurityGroupRecord, SnapshotRecord, VolumeRecord,
};
pub use unsupported::{ACCEPTED_METHODS, UNSUPPORTED_METHODS};

use crate::account::{self, MockAws};
use crate::error::{AwsError, Ec2Result};
use crate::lifecycle::Lifecycle;
use crate::store::{AccountId, InstanceState, Store};

/// Environment fallbacks for omitted credentials
pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

/// Empty filter means "everything the account owns"
fn selected(filter: &[&str], key: &str) -> bool {
    filter.is_empty() || filter.iter().any(|f| *f == key)
}

/// EC2 client bound to one credential pair
#[derive(Debug, Clone)]
pub struct Ec2 {
    aws: MockAws,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
}

impl Ec2 {
    /// Bind a facade to `aws`; a missing credential is read from the
    /// environment
    pub fn new(aws: MockAws, access_key_id: Option<&str>, secret_access_key: Option<&str>) -> Self {
        let access_key_id = access_key_id
            .map(str::to_string)
            .or_else(|| std::env::var(ACCESS_KEY_ENV).ok());
        let secret_access_key = secret_access_key
            .map(str::to_string)
            .or_else(|| std::env::var(SECRET_KEY_ENV).ok());

        Self {
            aws,
            access_key_id,
            secret_access_key,
        }
    }

    /// The handle this facade operates on
    pub fn mock(&self) -> &MockAws {
        &self.aws
    }

    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    /// Resolve the credential pair to its account
    pub fn account(&self) -> Ec2Result<AccountId> {
        Ok(self.aws.with_store(|store| self.authenticate(store))?)
    }

    fn authenticate(&self, store: &Store) -> Result<AccountId, AwsError> {
        account::authenticate(
            store,
            self.access_key_id.as_deref(),
            self.secret_access_key.as_deref(),
        )
    }

    /// Authenticated read
    fn read<R>(&self, f: impl FnOnce(&Store, AccountId) -> R) -> Ec2Result<R> {
        let result = self.aws.with_store(|store| {
            let account = self.authenticate(store)?;
            Ok::<_, AwsError>(f(store, account))
        })?;
        Ok(result)
    }

    /// Authenticated mutation through the lifecycle engine
    fn write<R>(&self, f: impl FnOnce(&mut Lifecycle<'_>) -> Result<R, AwsError>) -> Ec2Result<R> {
        let result = self.aws.with_state(|state| {
            let account = self.authenticate(&state.store)?;
            let mut engine = Lifecycle::new(&mut state.store, &state.config, account);
            f(&mut engine)
        })?;
        Ok(result)
    }

    // =========================================================================
    // Instances
    // =========================================================================

    pub fn describe_instances(&self, instance_ids: &[&str]) -> Ec2Result<Vec<InstanceRecord>> {
        self.read(|store, account| {
            store
                .instances(account)
                .filter(|i| selected(instance_ids, &i.id))
                .map(|i| InstanceRecord::render(store, i))
                .collect()
        })
    }

    /// Launch one instance of `image_id`
    pub fn launch_instances(
        &self,
        image_id: &str,
        params: LaunchParams,
    ) -> Ec2Result<Vec<LaunchedInstance>> {
        self.write(|engine| {
            let id = engine.launch_instance(image_id, &params)?;
            let store = engine.store();
            Ok(store
                .instance(engine.account(), &id)
                .map(|i| LaunchedInstance::render(store, i))
                .into_iter()
                .collect())
        })
    }

    /// `launch_instances` with explicit counts
    pub fn run_instances(
        &self,
        image_id: &str,
        min_count: u32,
        max_count: u32,
        params: LaunchParams,
    ) -> Ec2Result<Vec<LaunchedInstance>> {
        self.launch_instances(
            image_id,
            LaunchParams {
                min_count,
                max_count,
                ..params
            },
        )
    }

    /// Terminate the listed instances; unknown ids are ignored
    ///
    /// Each record is rendered before removal and reports `shutting-down`.
    pub fn terminate_instances(&self, instance_ids: &[&str]) -> Ec2Result<Vec<InstanceRecord>> {
        self.write(|engine| {
            let mut terminated = Vec::new();
            for id in instance_ids {
                let Some(record) = engine
                    .store()
                    .instance(engine.account(), id)
                    .map(|i| InstanceRecord::render(engine.store(), i))
                else {
                    tracing::debug!("terminate_instances: skipping unknown {}", id);
                    continue;
                };

                if engine.terminate_instance(id).is_some() {
                    terminated.push(record.with_state(InstanceState::ShuttingDown));
                }
            }
            Ok(terminated)
        })
    }

    // =========================================================================
    // Security groups
    // =========================================================================

    pub fn describe_security_groups(&self, names: &[&str]) -> Ec2Result<Vec<SecurityGroupRecord>> {
        self.read(|store, account| {
            store
                .security_groups(account)
                .filter(|g| selected(names, &g.name))
                .map(SecurityGroupRecord::from)
                .collect()
        })
    }

    pub fn create_security_group(&self, name: &str, description: &str) -> Ec2Result<bool> {
        self.write(|engine| engine.create_security_group(name, description).map(|_| true))
    }

    /// `false` when the account has no group by that name
    pub fn delete_security_group(&self, name: &str) -> Ec2Result<bool> {
        self.write(|engine| Ok(engine.delete_security_group(name)))
    }

    // =========================================================================
    // Keys
    // =========================================================================

    pub fn describe_key_pairs(&self, names: &[&str]) -> Ec2Result<Vec<KeypairRecord>> {
        self.read(|store, account| {
            store
                .keypairs(account)
                .filter(|k| selected(names, &k.name))
                .map(KeypairRecord::from)
                .collect()
        })
    }

    pub fn create_key_pair(&self, name: &str) -> Ec2Result<KeypairRecord> {
        self.write(|engine| engine.create_keypair(name).map(|k| KeypairRecord::from(&k)))
    }

    pub fn delete_key_pair(&self, name: &str) -> Ec2Result<bool> {
        self.write(|engine| engine.delete_keypair(name).map(|_| true))
    }

    // =========================================================================
    // Elastic IPs
    // =========================================================================

    /// Allocate an address and return its value
    pub fn allocate_address(&self) -> Ec2Result<String> {
        self.write(|engine| engine.allocate_address())
    }

    pub fn associate_address(&self, instance_id: &str, public_ip: &str) -> Ec2Result<bool> {
        self.write(|engine| engine.associate_address(instance_id, public_ip).map(|_| true))
    }

    pub fn describe_addresses(&self, public_ips: &[&str]) -> Ec2Result<Vec<AddressRecord>> {
        self.read(|store, account| {
            store
                .addresses(account)
                .filter(|a| selected(public_ips, &a.value))
                .map(AddressRecord::from)
                .collect()
        })
    }

    pub fn disassociate_address(&self, public_ip: &str) -> Ec2Result<bool> {
        self.write(|engine| engine.disassociate_address(public_ip).map(|_| true))
    }

    pub fn release_address(&self, public_ip: &str) -> Ec2Result<bool> {
        self.write(|engine| engine.release_address(public_ip).map(|_| true))
    }

    // =========================================================================
    // Availability zones
    // =========================================================================

    /// Fixed zone list; needs no credentials
    pub fn describe_availability_zones(&self, zone_names: &[&str]) -> Vec<AvailabilityZone> {
        shape::AVAILABILITY_ZONES
            .iter()
            .filter(|zone| selected(zone_names, zone))
            .map(|zone| AvailabilityZone::available(zone))
            .collect()
    }

    // =========================================================================
    // EBS: Volumes
    // =========================================================================

    pub fn describe_volumes(&self, volume_ids: &[&str]) -> Ec2Result<Vec<VolumeRecord>> {
        self.read(|store, account| {
            store
                .volumes(account)
                .filter(|v| selected(volume_ids, &v.id))
                .map(VolumeRecord::from)
                .collect()
        })
    }

    /// Create a volume, optionally from a snapshot; it starts as `creating`
    pub fn create_volume(
        &self,
        snapshot_id: Option<&str>,
        size: Option<u32>,
        zone: Option<&str>,
    ) -> Ec2Result<VolumeRecord> {
        self.write(|engine| Ok(VolumeRecord::from(&engine.create_volume(snapshot_id, size, zone))))
    }

    /// Delete a volume; `None` when the account has no such volume
    pub fn delete_volume(&self, volume_id: &str) -> Ec2Result<Option<VolumeRecord>> {
        self.write(|engine| Ok(engine.delete_volume(volume_id).as_ref().map(VolumeRecord::from)))
    }

    pub fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Ec2Result<VolumeRecord> {
        self.write(|engine| {
            engine.attach_volume(volume_id, instance_id, device)?;
            Self::volume_record(engine, volume_id)
        })
    }

    pub fn detach_volume(&self, volume_id: &str) -> Ec2Result<VolumeRecord> {
        self.write(|engine| {
            engine.detach_volume(volume_id)?;
            Self::volume_record(engine, volume_id)
        })
    }

    fn volume_record(engine: &Lifecycle<'_>, volume_id: &str) -> Result<VolumeRecord, AwsError> {
        engine
            .store()
            .volume(engine.account(), volume_id)
            .map(VolumeRecord::from)
            .ok_or_else(|| AwsError::volume_not_found(volume_id))
    }

    // =========================================================================
    // EBS: Snapshots
    // =========================================================================

    pub fn describe_snapshots(&self, snapshot_ids: &[&str]) -> Ec2Result<Vec<SnapshotRecord>> {
        self.read(|store, account| {
            store
                .snapshots(account)
                .filter(|s| selected(snapshot_ids, &s.id))
                .map(SnapshotRecord::steady)
                .collect()
        })
    }

    /// Snapshot a volume; the response uses the pending view
    pub fn create_snapshot(&self, volume_id: &str) -> Ec2Result<SnapshotRecord> {
        self.write(|engine| Ok(SnapshotRecord::pending(&engine.create_snapshot(volume_id))))
    }

    pub fn delete_snapshot(&self, snapshot_id: &str) -> Ec2Result<Option<SnapshotRecord>> {
        self.write(|engine| {
            Ok(engine
                .delete_snapshot(snapshot_id)
                .as_ref()
                .map(SnapshotRecord::steady))
        })
    }
}
