//! Resource Store
//!
//! In-memory maps for every entity type, keyed by identifier, plus the
//! instance/security-group join set. Every lookup that takes an
//! [`AccountId`] only sees rows owned by that account; a resource belonging
//! to someone else behaves exactly like a missing one.
//!
//! The store enforces no business rules. Uniqueness, quotas and cascades
//! live in [`crate::lifecycle`].

mod model;

pub use model::*;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// All simulated state
#[derive(Debug, Default)]
pub struct Store {
    /// Registration order
    accounts: Vec<Account>,
    instances: BTreeMap<String, Instance>,
    addresses: BTreeMap<String, Address>,
    keypairs: BTreeMap<SerialId, Keypair>,
    volumes: BTreeMap<String, Volume>,
    snapshots: BTreeMap<String, Snapshot>,
    security_groups: BTreeMap<SerialId, SecurityGroup>,
    memberships: BTreeSet<InstanceXSecurityGroup>,
    next_serial: SerialId,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every account and everything owned by it
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Allocate the next serial id (keypairs, security groups)
    pub fn next_serial(&mut self) -> SerialId {
        self.next_serial += 1;
        self.next_serial
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Earliest registered account with this access key
    pub fn account_by_access_key(&self, access_key_id: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.access_key_id == access_key_id)
    }

    pub fn insert_account(&mut self, account: Account) {
        self.accounts.push(account);
    }

    // =========================================================================
    // Instances
    // =========================================================================

    pub fn instances(&self, account: AccountId) -> impl Iterator<Item = &Instance> {
        self.instances.values().filter(move |i| i.account == account)
    }

    pub fn instance(&self, account: AccountId, id: &str) -> Option<&Instance> {
        self.instances.get(id).filter(|i| i.account == account)
    }

    pub fn insert_instance(&mut self, instance: Instance) {
        self.instances.insert(instance.id.clone(), instance);
    }

    pub fn remove_instance(&mut self, account: AccountId, id: &str) -> Option<Instance> {
        self.instance(account, id)?;
        self.instances.remove(id)
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    pub fn addresses(&self, account: AccountId) -> impl Iterator<Item = &Address> {
        self.addresses.values().filter(move |a| a.account == account)
    }

    pub fn address(&self, account: AccountId, value: &str) -> Option<&Address> {
        self.addresses.get(value).filter(|a| a.account == account)
    }

    pub fn address_mut(&mut self, account: AccountId, value: &str) -> Option<&mut Address> {
        self.addresses
            .get_mut(value)
            .filter(|a| a.account == account)
    }

    /// Address currently associated with an instance, if any
    pub fn address_for_instance(&self, instance_id: &str) -> Option<&Address> {
        self.addresses
            .values()
            .find(|a| a.instance.as_deref() == Some(instance_id))
    }

    /// Clear every association pointing at an instance
    pub fn clear_address_associations(&mut self, instance_id: &str) -> usize {
        let mut cleared = 0;
        for address in self.addresses.values_mut() {
            if address.instance.as_deref() == Some(instance_id) {
                address.instance = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Insert an address unless its value is already held by any account
    ///
    /// Returns `false`, leaving the existing row in place, when the value
    /// is taken.
    #[must_use]
    pub fn insert_address(&mut self, address: Address) -> bool {
        match self.addresses.entry(address.value.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(address);
                true
            },
            Entry::Occupied(_) => false,
        }
    }

    pub fn remove_address(&mut self, account: AccountId, value: &str) -> Option<Address> {
        self.address(account, value)?;
        self.addresses.remove(value)
    }

    // =========================================================================
    // Keypairs
    // =========================================================================

    pub fn keypairs(&self, account: AccountId) -> impl Iterator<Item = &Keypair> {
        self.keypairs.values().filter(move |k| k.account == account)
    }

    pub fn keypair(&self, id: SerialId) -> Option<&Keypair> {
        self.keypairs.get(&id)
    }

    pub fn keypair_by_name(&self, account: AccountId, name: &str) -> Option<&Keypair> {
        self.keypairs(account).find(|k| k.name == name)
    }

    pub fn insert_keypair(&mut self, keypair: Keypair) {
        self.keypairs.insert(keypair.id, keypair);
    }

    pub fn remove_keypair(&mut self, id: SerialId) -> Option<Keypair> {
        self.keypairs.remove(&id)
    }

    // =========================================================================
    // Volumes
    // =========================================================================

    pub fn volumes(&self, account: AccountId) -> impl Iterator<Item = &Volume> {
        self.volumes.values().filter(move |v| v.account == account)
    }

    pub fn volume(&self, account: AccountId, id: &str) -> Option<&Volume> {
        self.volumes.get(id).filter(|v| v.account == account)
    }

    pub fn volume_mut(&mut self, account: AccountId, id: &str) -> Option<&mut Volume> {
        self.volumes.get_mut(id).filter(|v| v.account == account)
    }

    /// Ids of the volumes whose instance reference points at `instance_id`
    pub fn volumes_attached_to(&self, instance_id: &str) -> Vec<String> {
        self.volumes
            .values()
            .filter(|v| v.instance.as_deref() == Some(instance_id))
            .map(|v| v.id.clone())
            .collect()
    }

    pub fn insert_volume(&mut self, volume: Volume) {
        self.volumes.insert(volume.id.clone(), volume);
    }

    pub fn remove_volume(&mut self, account: AccountId, id: &str) -> Option<Volume> {
        self.volume(account, id)?;
        self.volumes.remove(id)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn snapshots(&self, account: AccountId) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.values().filter(move |s| s.account == account)
    }

    pub fn snapshot(&self, account: AccountId, id: &str) -> Option<&Snapshot> {
        self.snapshots.get(id).filter(|s| s.account == account)
    }

    pub fn insert_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.id.clone(), snapshot);
    }

    pub fn remove_snapshot(&mut self, account: AccountId, id: &str) -> Option<Snapshot> {
        self.snapshot(account, id)?;
        self.snapshots.remove(id)
    }

    // =========================================================================
    // Security groups and memberships
    // =========================================================================

    pub fn security_groups(&self, account: AccountId) -> impl Iterator<Item = &SecurityGroup> {
        self.security_groups
            .values()
            .filter(move |g| g.account == account)
    }

    pub fn security_group_by_name(&self, account: AccountId, name: &str) -> Option<&SecurityGroup> {
        self.security_groups(account).find(|g| g.name == name)
    }

    pub fn insert_security_group(&mut self, group: SecurityGroup) {
        self.security_groups.insert(group.id, group);
    }

    pub fn remove_security_group(&mut self, id: SerialId) -> Option<SecurityGroup> {
        self.security_groups.remove(&id)
    }

    pub fn add_membership(&mut self, instance_id: &str, security_group_id: SerialId) {
        self.memberships.insert(InstanceXSecurityGroup {
            instance_id: instance_id.to_string(),
            security_group_id,
        });
    }

    /// Security groups an instance is a member of, ordered by group id
    pub fn groups_of<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> impl Iterator<Item = &'a SecurityGroup> {
        self.memberships
            .iter()
            .filter(move |m| m.instance_id == instance_id)
            .filter_map(move |m| self.security_groups.get(&m.security_group_id))
    }

    /// Instances that are members of a security group
    pub fn members_of(&self, security_group_id: SerialId) -> impl Iterator<Item = &str> {
        self.memberships
            .iter()
            .filter(move |m| m.security_group_id == security_group_id)
            .map(|m| m.instance_id.as_str())
    }

    pub fn remove_instance_memberships(&mut self, instance_id: &str) {
        self.memberships.retain(|m| m.instance_id != instance_id);
    }

    pub fn remove_group_memberships(&mut self, security_group_id: SerialId) {
        self.memberships
            .retain(|m| m.security_group_id != security_group_id);
    }
}
