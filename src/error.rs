//! Error taxonomy
//!
//! Every rejection raised by the fake is an [`AwsError`] carrying one of the
//! provider's error codes and a message, rendered as `"<Code>: <message>"` the
//! way the real client library reports them. Verbs the fake does not model
//! fail with [`Ec2Error::NotImplemented`] instead, so test code can tell
//! "unsupported" apart from "rejected".

use thiserror::Error;

/// The result of a facade operation.
pub type Ec2Result<T> = Result<T, Ec2Error>;

/// Provider error codes raised by the fake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AwsErrorCode {
    AuthFailure,
    DuplicateGroup,
    DuplicateKeypair,
    AddressLimitExceeded,
    VolumeNotFound,
    InstanceNotFound,
    KeypairNotFound,
    /// Only raised under [`crate::config::UnknownGroupPolicy::Reject`]
    GroupNotFound,
    /// Only raised under [`crate::config::DoubleAttachPolicy::Reject`]
    VolumeInUse,
    InvalidParameterValue,
}

impl AwsErrorCode {
    /// Code string as the provider spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthFailure => "AuthFailure",
            Self::DuplicateGroup => "InvalidGroup.Duplicate",
            Self::DuplicateKeypair => "InvalidKeyPair.Duplicate",
            Self::AddressLimitExceeded => "AddressLimitExceeded",
            Self::VolumeNotFound => "InvalidVolume.NotFound",
            Self::InstanceNotFound => "InvalidInstanceID.NotFound",
            Self::KeypairNotFound => "InvalidKeyPair.NotFound",
            Self::GroupNotFound => "InvalidGroup.NotFound",
            Self::VolumeInUse => "VolumeInUse",
            Self::InvalidParameterValue => "InvalidParameterValue",
        }
    }
}

impl std::fmt::Display for AwsErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-shaped rejection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct AwsError {
    pub code: AwsErrorCode,
    pub message: String,
}

impl AwsError {
    pub fn new(code: AwsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn auth_failure() -> Self {
        Self::new(
            AwsErrorCode::AuthFailure,
            "AWS was not able to validate the provided access credentials",
        )
    }

    pub fn address_not_owned(public_ip: &str) -> Self {
        Self::new(
            AwsErrorCode::AuthFailure,
            format!("The address {} does not belong to you", public_ip),
        )
    }

    pub fn duplicate_group(name: &str) -> Self {
        Self::new(
            AwsErrorCode::DuplicateGroup,
            format!("The security group '{}' already exists", name),
        )
    }

    pub fn duplicate_keypair(name: &str) -> Self {
        Self::new(
            AwsErrorCode::DuplicateKeypair,
            format!("The keypair '{}' already exists.", name),
        )
    }

    pub fn address_limit() -> Self {
        Self::new(
            AwsErrorCode::AddressLimitExceeded,
            "Too many addresses allocated",
        )
    }

    pub fn volume_not_found(volume_id: &str) -> Self {
        Self::new(
            AwsErrorCode::VolumeNotFound,
            format!("The volume '{}' does not exist.", volume_id),
        )
    }

    pub fn instance_not_found(instance_id: &str) -> Self {
        Self::new(
            AwsErrorCode::InstanceNotFound,
            format!("The instance '{}' does not exist.", instance_id),
        )
    }

    pub fn keypair_not_found(name: &str) -> Self {
        Self::new(
            AwsErrorCode::KeypairNotFound,
            format!("The key pair '{}' does not exist", name),
        )
    }

    pub fn group_not_found(name: &str) -> Self {
        Self::new(
            AwsErrorCode::GroupNotFound,
            format!("The security group '{}' does not exist", name),
        )
    }

    pub fn volume_in_use(volume_id: &str) -> Self {
        Self::new(
            AwsErrorCode::VolumeInUse,
            format!("{} is already attached to an instance", volume_id),
        )
    }

    pub fn user_data_too_large(len: usize, max: usize) -> Self {
        Self::new(
            AwsErrorCode::InvalidParameterValue,
            format!("User data is limited to {} bytes, got {}", max, len),
        )
    }
}

/// Errors returned by the facade
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ec2Error {
    /// The fake rejected the request
    #[error(transparent)]
    Aws(#[from] AwsError),

    /// The verb exists on the real API but the fake does not model it
    #[error("{0} is not implemented by mockec2")]
    NotImplemented(&'static str),

    /// A dispatched call carried a missing or malformed parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Ec2Error {
    /// The provider code, when this is a domain rejection
    pub fn code(&self) -> Option<AwsErrorCode> {
        match self {
            Self::Aws(e) => Some(e.code),
            _ => None,
        }
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_prefixed_with_code() {
        let err = AwsError::duplicate_group("web");
        assert_eq!(
            err.to_string(),
            "InvalidGroup.Duplicate: The security group 'web' already exists"
        );

        let err = AwsError::auth_failure();
        assert!(err.to_string().starts_with("AuthFailure: "));
    }

    #[test]
    fn test_keypair_not_found_has_its_own_code() {
        let err = AwsError::keypair_not_found("k1");
        assert_eq!(err.code.as_str(), "InvalidKeyPair.NotFound");
        assert_eq!(
            err.to_string(),
            "InvalidKeyPair.NotFound: The key pair 'k1' does not exist"
        );
    }

    #[test]
    fn test_user_data_too_large() {
        let err = AwsError::user_data_too_large(5000, 4096);
        assert_eq!(
            err.to_string(),
            "InvalidParameterValue: User data is limited to 4096 bytes, got 5000"
        );
    }

    #[test]
    fn test_not_implemented_is_distinct_from_aws_errors() {
        let unsupported = Ec2Error::NotImplemented("register_image");
        assert!(unsupported.is_not_implemented());
        assert_eq!(unsupported.code(), None);

        let rejected: Ec2Error = AwsError::address_limit().into();
        assert!(!rejected.is_not_implemented());
        assert_eq!(rejected.code(), Some(AwsErrorCode::AddressLimitExceeded));
        assert_eq!(
            rejected.to_string(),
            "AddressLimitExceeded: Too many addresses allocated"
        );
    }
}
