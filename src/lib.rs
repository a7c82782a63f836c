//! mockec2 - an in-memory fake of the EC2 compute API
//!
//! Client code that provisions instances, volumes, snapshots, elastic IPs,
//! security groups and key pairs can run against this crate in tests instead
//! of a real account. Nothing touches the network and nothing survives the
//! process.
//!
//! # Architecture
//!
//! - [`ids`] - Random hex identifiers, IP values and DNS names
//! - [`store`] - Entity maps scoped per account
//! - [`account`] - Credential registration, authentication and reset
//! - [`lifecycle`] - Uniqueness, quota and cascade rules over the store
//! - [`ec2`] - The provider-style verb surface and its response records
//! - [`scenario`] - YAML scenarios replayed through [`ec2::dispatch`]
//! - [`assertions`] - Account predicates for test code
//!
//! # Example
//!
//! ```
//! use mockec2::{ec2::LaunchParams, MockAws};
//!
//! let aws = MockAws::default();
//! aws.register("hello", "world");
//!
//! let ec2 = aws.ec2("hello", "world");
//! let launched = ec2.launch_instances("ami-foobar", LaunchParams::default()).unwrap();
//! assert_eq!(launched[0].aws_image_id, "ami-foobar");
//! ```

pub mod account;
pub mod assertions;
pub mod config;
pub mod ec2;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod scenario;
pub mod store;

pub use account::MockAws;
pub use config::Config;
pub use ec2::Ec2;
pub use error::{AwsError, AwsErrorCode, Ec2Error, Ec2Result};
