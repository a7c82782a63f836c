//! Account Registry
//!
//! Accounts are the scoping root for every simulated resource. An account is
//! created by registering a credential pair and lives until the whole fake is
//! reset; there is no per-account removal and no credential update.
//!
//! [`MockAws`] is the explicit store handle test code owns. It is cheap to
//! clone, and every clone sees the same state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Config;
use crate::ec2::Ec2;
use crate::error::AwsError;
use crate::lifecycle::{DEFAULT_GROUP_DESCRIPTION, DEFAULT_GROUP_NAME};
use crate::store::{Account, AccountId, SecurityGroup, Store};

/// Everything behind a [`MockAws`] handle
#[derive(Debug, Default)]
pub struct State {
    pub config: Config,
    pub store: Store,
}

/// Register a credential pair, returning the existing account if the exact
/// pair is already known
///
/// A fresh account gets its `default` security group immediately. Returns
/// `None` when either credential is absent.
pub fn register(
    store: &mut Store,
    access_key_id: Option<&str>,
    secret_access_key: Option<&str>,
) -> Option<AccountId> {
    Some(register_pair(store, access_key_id?, secret_access_key?))
}

fn register_pair(store: &mut Store, access_key_id: &str, secret_access_key: &str) -> AccountId {
    if let Some(existing) = store.accounts().find(|a| {
        a.access_key_id == access_key_id && a.secret_access_key == secret_access_key
    }) {
        return existing.id;
    }

    let id = AccountId::new();
    store.insert_account(Account {
        id,
        access_key_id: access_key_id.to_string(),
        secret_access_key: secret_access_key.to_string(),
    });

    let group_id = store.next_serial();
    store.insert_security_group(SecurityGroup {
        id: group_id,
        account: id,
        name: DEFAULT_GROUP_NAME.to_string(),
        description: DEFAULT_GROUP_DESCRIPTION.to_string(),
    });

    tracing::info!("Registered account {} for access key {}", id, access_key_id);
    id
}

/// Authenticate a credential pair against the store
pub fn authenticate(
    store: &Store,
    access_key_id: Option<&str>,
    secret_access_key: Option<&str>,
) -> Result<AccountId, AwsError> {
    let account = access_key_id.and_then(|key| store.account_by_access_key(key));

    match account {
        Some(account) if Some(account.secret_access_key.as_str()) == secret_access_key => {
            Ok(account.id)
        },
        _ => {
            tracing::warn!("Authentication failed for access key {:?}", access_key_id);
            Err(AwsError::auth_failure())
        },
    }
}

/// Handle to one isolated fake
#[derive(Debug, Clone, Default)]
pub struct MockAws {
    inner: Arc<Mutex<State>>,
}

impl MockAws {
    /// Create an empty fake with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                config,
                store: Store::new(),
            })),
        }
    }

    /// Lock the state
    ///
    /// Operations never leave the store half-updated, so a panic in another
    /// holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the state
    ///
    /// The lock is not reentrant: `f` must not call back into this handle
    /// or any clone of it, including through an [`Ec2`] client.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.lock();
        f(&mut state)
    }

    /// Run `f` with read access to the store
    ///
    /// Holds the same lock as [`Self::with_state`]. Copy what you need out
    /// of the store and inspect it after `f` returns.
    pub fn with_store<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        let state = self.lock();
        f(&state.store)
    }

    /// Current configuration
    pub fn config(&self) -> Config {
        self.lock().config.clone()
    }

    /// Replace the configuration; existing resources are kept
    pub fn set_config(&self, config: Config) {
        self.lock().config = config;
    }

    /// Register a credential pair (idempotent)
    pub fn register(&self, access_key_id: &str, secret_access_key: &str) -> AccountId {
        register_pair(&mut self.lock().store, access_key_id, secret_access_key)
    }

    /// Register a pair where either half may be missing
    pub fn try_register(
        &self,
        access_key_id: Option<&str>,
        secret_access_key: Option<&str>,
    ) -> Option<AccountId> {
        register(&mut self.lock().store, access_key_id, secret_access_key)
    }

    /// Authenticate a credential pair
    pub fn authenticate(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<AccountId, AwsError> {
        authenticate(&self.lock().store, Some(access_key_id), Some(secret_access_key))
    }

    /// Look an account up by access key, without authenticating
    pub fn account(&self, access_key_id: &str) -> Option<Account> {
        self.lock().store.account_by_access_key(access_key_id).cloned()
    }

    /// Drop every account and every resource; calling it twice is harmless
    pub fn reset(&self) {
        self.lock().store.clear();
        tracing::debug!("Reset mock state");
    }

    /// Facade bound to a credential pair
    pub fn ec2(&self, access_key_id: &str, secret_access_key: &str) -> Ec2 {
        Ec2::new(self.clone(), Some(access_key_id), Some(secret_access_key))
    }

    /// Facade bound to `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
    pub fn ec2_from_env(&self) -> Ec2 {
        Ec2::new(self.clone(), None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AwsErrorCode;

    #[test]
    fn test_register_is_idempotent() {
        let aws = MockAws::default();
        let first = aws.register("hello", "world");
        let second = aws.register("hello", "world");
        assert_eq!(first, second);
        aws.with_store(|store| assert_eq!(store.accounts().count(), 1));
    }

    #[test]
    fn test_register_creates_default_group() {
        let aws = MockAws::default();
        let id = aws.register("hello", "world");
        aws.with_store(|store| {
            let group = store.security_group_by_name(id, "default").unwrap();
            assert_eq!(group.description, "default group");
        });
    }

    #[test]
    fn test_register_without_credentials_does_nothing() {
        let aws = MockAws::default();
        assert!(aws.try_register(Some("hello"), None).is_none());
        assert!(aws.try_register(None, Some("world")).is_none());
        aws.with_store(|store| assert_eq!(store.accounts().count(), 0));
    }

    #[test]
    fn test_authenticate() {
        let aws = MockAws::default();
        let id = aws.register("hello", "world");

        assert_eq!(aws.authenticate("hello", "world"), Ok(id));

        let err = aws.authenticate("goodbye", "world").unwrap_err();
        assert_eq!(err.code, AwsErrorCode::AuthFailure);

        let err = aws.authenticate("hello", "daffodil").unwrap_err();
        assert_eq!(err.code, AwsErrorCode::AuthFailure);
    }

    #[test]
    fn test_reset_wipes_everything_and_is_idempotent() {
        let aws = MockAws::default();
        aws.register("hello", "world");
        aws.reset();
        aws.reset();

        assert!(aws.account("hello").is_none());
        assert!(aws.authenticate("hello", "world").is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let aws = MockAws::default();
        let other = aws.clone();
        aws.register("hello", "world");
        assert!(other.account("hello").is_some());
    }

    #[test]
    fn test_set_config_is_visible() {
        let aws = MockAws::default();
        aws.set_config(Config::default().with_address_limit(1));
        assert_eq!(aws.config().address_limit, 1);
    }
}
