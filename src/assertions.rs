//! Account Assertions
//!
//! Predicates over everything one account owns, for tests that drive client
//! code against the fake and then inspect the result. Each check returns a
//! failure carrying a message that names what was expected and lists what
//! the account actually holds, in response-record form.
//!
//! ```
//! use mockec2::assertions::AccountAssertions;
//! use mockec2::MockAws;
//!
//! let aws = MockAws::default();
//! aws.register("hello", "world");
//! aws.ec2("hello", "world").create_key_pair("deploy").unwrap();
//!
//! let account = AccountAssertions::new(&aws, "hello").unwrap();
//! account.has_keypairs(&["deploy"]).unwrap();
//! assert!(account.has_keypairs(&["other"]).is_err());
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::account::MockAws;
use crate::ec2::{
    AddressRecord, InstanceRecord, KeypairRecord, SecurityGroupRecord, VolumeRecord,
};
use crate::store::{AccountId, Instance, Store, Volume};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected AWS account {0}")]
pub struct AssertionFailure(pub String);

pub type Check = Result<(), AssertionFailure>;

fn check(ok: bool, message: impl FnOnce() -> String) -> Check {
    if ok {
        Ok(())
    } else {
        Err(AssertionFailure(message()))
    }
}

fn render<T: Serialize>(records: &[T]) -> String {
    serde_json::to_string(records).unwrap_or_else(|e| format!("<unrenderable: {}>", e))
}

/// Checks against the account that owns an access key
#[derive(Debug, Clone)]
pub struct AccountAssertions {
    aws: MockAws,
    account: AccountId,
}

impl AccountAssertions {
    /// Bind to the earliest account registered with `access_key_id`
    pub fn new(aws: &MockAws, access_key_id: &str) -> Result<Self, AssertionFailure> {
        let account = aws
            .account(access_key_id)
            .ok_or_else(|| {
                AssertionFailure(format!("with access key '{}' to exist", access_key_id))
            })?;

        Ok(Self {
            aws: aws.clone(),
            account: account.id,
        })
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Run `f` under the store lock
    ///
    /// `f` must not reach back into the fake; caller predicates run on
    /// copies taken here, after the lock is released.
    fn with_store<R>(&self, f: impl FnOnce(&Store, AccountId) -> R) -> R {
        self.aws.with_store(|store| f(store, self.account))
    }

    fn instances(&self) -> Vec<Instance> {
        self.with_store(|store, account| store.instances(account).cloned().collect())
    }

    fn volumes(&self) -> Vec<Volume> {
        self.with_store(|store, account| store.volumes(account).cloned().collect())
    }

    // ===== Keypairs =====

    pub fn has_keypairs(&self, names: &[&str]) -> Check {
        self.with_store(|store, account| {
            let held: Vec<KeypairRecord> =
                store.keypairs(account).map(KeypairRecord::from).collect();
            let ok = names
                .iter()
                .all(|name| held.iter().any(|k| k.aws_key_name == *name));
            check(ok, || {
                format!(
                    "to have keypair(s) named {:?}, instead it contained {}",
                    names,
                    render(&held)
                )
            })
        })
    }

    pub fn only_has_keypairs(&self, names: &[&str]) -> Check {
        self.with_store(|store, account| {
            let held: Vec<KeypairRecord> =
                store.keypairs(account).map(KeypairRecord::from).collect();
            let ok = held.len() == names.len()
                && names
                    .iter()
                    .all(|name| held.iter().any(|k| k.aws_key_name == *name));
            check(ok, || {
                format!(
                    "to only have keypair(s) named {:?}, instead it contained {}",
                    names,
                    render(&held)
                )
            })
        })
    }

    // ===== Addresses =====

    pub fn has_addresses(&self, public_ips: &[&str]) -> Check {
        self.with_store(|store, account| {
            let held: Vec<AddressRecord> =
                store.addresses(account).map(AddressRecord::from).collect();
            let ok = public_ips
                .iter()
                .all(|ip| held.iter().any(|a| a.public_ip == *ip));
            check(ok, || {
                format!(
                    "to have IP address(es) {:?}, but it was {}",
                    public_ips,
                    render(&held)
                )
            })
        })
    }

    pub fn only_has_addresses(&self, public_ips: &[&str]) -> Check {
        self.with_store(|store, account| {
            let held: Vec<AddressRecord> =
                store.addresses(account).map(AddressRecord::from).collect();
            let ok = held.len() == public_ips.len()
                && public_ips
                    .iter()
                    .all(|ip| held.iter().any(|a| a.public_ip == *ip));
            check(ok, || {
                format!(
                    "to only have IP address(es) {:?}, but it was {}",
                    public_ips,
                    render(&held)
                )
            })
        })
    }

    // ===== Security groups =====

    /// A group named `name`, optionally with exactly this description
    pub fn has_security_group(&self, name: &str, description: Option<&str>) -> Check {
        self.security_group_check(name, description, false)
    }

    /// As [`Self::has_security_group`], and no other group exists
    pub fn only_has_security_group(&self, name: &str, description: Option<&str>) -> Check {
        self.security_group_check(name, description, true)
    }

    fn security_group_check(&self, name: &str, description: Option<&str>, only: bool) -> Check {
        self.with_store(|store, account| {
            let held: Vec<SecurityGroupRecord> = store
                .security_groups(account)
                .map(SecurityGroupRecord::from)
                .collect();

            let found = held.iter().any(|g| {
                g.aws_group_name == name && description.map_or(true, |d| g.aws_description == d)
            });
            let ok = found && (!only || held.len() == 1);

            check(ok, || {
                let mut expected = if only {
                    format!("to only have a security group named '{}'", name)
                } else {
                    format!("to have a security group named '{}'", name)
                };
                if let Some(d) = description {
                    expected.push_str(&format!(" with description = {}", d));
                }
                format!("{}, but it was {}", expected, render(&held))
            })
        })
    }

    // ===== Instances =====

    /// Some instance satisfies `predicate`
    pub fn has_instance(&self, predicate: impl Fn(&Instance) -> bool) -> Check {
        let ok = self.instances().iter().any(predicate);
        check(ok, || {
            let held: Vec<InstanceRecord> = self.with_store(|store, account| {
                store
                    .instances(account)
                    .map(|i| InstanceRecord::render(store, i))
                    .collect()
            });
            format!("to have a matching instance, but it was {}", render(&held))
        })
    }

    /// The instance exists and is a member of exactly the named groups
    pub fn instance_has_groups(&self, instance_id: &str, names: &[&str]) -> Check {
        self.with_store(|store, account| {
            let actual: Vec<&str> = store
                .instance(account, instance_id)
                .map(|_| store.groups_of(instance_id).map(|g| g.name.as_str()).collect())
                .unwrap_or_default();

            let ok = store.instance(account, instance_id).is_some()
                && actual.len() == names.len()
                && names.iter().all(|n| actual.iter().any(|a| a == n));
            check(ok, || {
                format!(
                    "to have instance {} in groups {:?}, but it was in {:?}",
                    instance_id, names, actual
                )
            })
        })
    }

    // ===== Volumes =====

    /// With ids: every listed volume exists and satisfies `predicate`.
    /// Without: some volume satisfies it.
    pub fn has_volumes(
        &self,
        volume_ids: &[&str],
        predicate: impl Fn(&Volume) -> bool,
    ) -> Check {
        let held = self.volumes();
        let ok = if volume_ids.is_empty() {
            held.iter().any(&predicate)
        } else {
            let matching = held
                .iter()
                .filter(|v| volume_ids.iter().any(|id| *id == v.id) && predicate(v))
                .count();
            matching == volume_ids.len()
        };
        check(ok, || volume_message("to have volumes", volume_ids, &held))
    }

    /// With ids: every volume the account holds is listed and satisfies
    /// `predicate`. Without: every volume satisfies it.
    pub fn only_has_volumes(
        &self,
        volume_ids: &[&str],
        predicate: impl Fn(&Volume) -> bool,
    ) -> Check {
        let held = self.volumes();
        let ok = held.iter().all(|v| {
            (volume_ids.is_empty() || volume_ids.iter().any(|id| *id == v.id)) && predicate(v)
        });
        check(ok, || volume_message("to only have volumes", volume_ids, &held))
    }
}

fn volume_message(expected: &str, volume_ids: &[&str], volumes: &[Volume]) -> String {
    let held: Vec<VolumeRecord> = volumes.iter().map(VolumeRecord::from).collect();
    format!("{} {:?}, but it was {}", expected, volume_ids, render(&held))
}
