//! Unmodeled verbs
//!
//! The real API surface is larger than the resource graph the fake
//! simulates. Image, bundle and console verbs fail loudly with
//! [`Ec2Error::NotImplemented`] so a test never silently depends on them.
//! A few permission verbs are accepted and do nothing, because client code
//! calls them as part of ordinary provisioning.

use std::convert::Infallible;

use super::Ec2;
use crate::error::{Ec2Error, Ec2Result};

/// Verbs that always fail with [`Ec2Error::NotImplemented`]
pub const UNSUPPORTED_METHODS: &[&str] = &[
    "describe_images",
    "describe_images_by_owner",
    "describe_images_by_executable_by",
    "register_image",
    "deregister_image",
    "describe_image_attribute",
    "reset_image_attribute",
    "modify_image_attribute",
    "modify_image_launch_perm_remove_users",
    "modify_image_launch_perm_add_groups",
    "modify_image_launch_perm_remove_groups",
    "modify_image_product_code",
    "confirm_product_instance",
    "get_console_output",
    "reboot_instances",
    "get_initial_password",
    "bundle_instance",
    "describe_bundle_tasks",
    "cancel_bundle_task",
    "revoke_security_group_named_ingress",
    "revoke_security_group_ip_ingress",
];

/// Verbs accepted as no-ops
pub const ACCEPTED_METHODS: &[&str] = &[
    "modify_image_launch_perm_add_users",
    "authorize_security_group_named_ingress",
    "authorize_security_group_ip_ingress",
];

fn unsupported(name: &'static str) -> Ec2Result<Infallible> {
    tracing::debug!("Refusing unmodeled verb {}", name);
    Err(Ec2Error::NotImplemented(name))
}

impl Ec2 {
    // ===== Images =====

    pub fn describe_images(&self, _image_ids: &[&str]) -> Ec2Result<Infallible> {
        unsupported("describe_images")
    }

    pub fn describe_images_by_owner(&self, _owners: &[&str]) -> Ec2Result<Infallible> {
        unsupported("describe_images_by_owner")
    }

    pub fn describe_images_by_executable_by(&self, _users: &[&str]) -> Ec2Result<Infallible> {
        unsupported("describe_images_by_executable_by")
    }

    pub fn register_image(&self, _image_location: &str) -> Ec2Result<Infallible> {
        unsupported("register_image")
    }

    pub fn deregister_image(&self, _image_id: &str) -> Ec2Result<Infallible> {
        unsupported("deregister_image")
    }

    pub fn describe_image_attribute(
        &self,
        _image_id: &str,
        _attribute: &str,
    ) -> Ec2Result<Infallible> {
        unsupported("describe_image_attribute")
    }

    pub fn reset_image_attribute(
        &self,
        _image_id: &str,
        _attribute: &str,
    ) -> Ec2Result<Infallible> {
        unsupported("reset_image_attribute")
    }

    pub fn modify_image_attribute(
        &self,
        _image_id: &str,
        _attribute: &str,
    ) -> Ec2Result<Infallible> {
        unsupported("modify_image_attribute")
    }

    // ===== Launch permissions and product codes =====

    /// Accepted and ignored
    pub fn modify_image_launch_perm_add_users(
        &self,
        image_id: &str,
        user_ids: &[&str],
    ) -> Ec2Result<bool> {
        tracing::debug!(
            "Ignoring launch permission grant on {} for {} users",
            image_id,
            user_ids.len()
        );
        Ok(true)
    }

    pub fn modify_image_launch_perm_remove_users(
        &self,
        _image_id: &str,
        _user_ids: &[&str],
    ) -> Ec2Result<Infallible> {
        unsupported("modify_image_launch_perm_remove_users")
    }

    pub fn modify_image_launch_perm_add_groups(
        &self,
        _image_id: &str,
        _groups: &[&str],
    ) -> Ec2Result<Infallible> {
        unsupported("modify_image_launch_perm_add_groups")
    }

    pub fn modify_image_launch_perm_remove_groups(
        &self,
        _image_id: &str,
        _groups: &[&str],
    ) -> Ec2Result<Infallible> {
        unsupported("modify_image_launch_perm_remove_groups")
    }

    pub fn modify_image_product_code(
        &self,
        _image_id: &str,
        _product_codes: &[&str],
    ) -> Ec2Result<Infallible> {
        unsupported("modify_image_product_code")
    }

    pub fn confirm_product_instance(
        &self,
        _product_code: &str,
        _instance_id: &str,
    ) -> Ec2Result<Infallible> {
        unsupported("confirm_product_instance")
    }

    // ===== Instances and bundles =====

    pub fn get_console_output(&self, _instance_id: &str) -> Ec2Result<Infallible> {
        unsupported("get_console_output")
    }

    pub fn reboot_instances(&self, _instance_ids: &[&str]) -> Ec2Result<Infallible> {
        unsupported("reboot_instances")
    }

    pub fn get_initial_password(&self, _instance_id: &str) -> Ec2Result<Infallible> {
        unsupported("get_initial_password")
    }

    pub fn bundle_instance(&self, _instance_id: &str, _s3_bucket: &str) -> Ec2Result<Infallible> {
        unsupported("bundle_instance")
    }

    pub fn describe_bundle_tasks(&self, _bundle_ids: &[&str]) -> Ec2Result<Infallible> {
        unsupported("describe_bundle_tasks")
    }

    pub fn cancel_bundle_task(&self, _bundle_id: &str) -> Ec2Result<Infallible> {
        unsupported("cancel_bundle_task")
    }

    // ===== Ingress =====

    /// Accepted and ignored; groups carry no permissions
    pub fn authorize_security_group_named_ingress(
        &self,
        name: &str,
        _owner: &str,
        _source_group: &str,
    ) -> Ec2Result<bool> {
        tracing::debug!("Ignoring named ingress grant on {}", name);
        Ok(true)
    }

    /// Accepted and ignored; groups carry no permissions
    pub fn authorize_security_group_ip_ingress(
        &self,
        name: &str,
        from_port: u16,
        to_port: u16,
        protocol: &str,
        cidr_ip: &str,
    ) -> Ec2Result<bool> {
        tracing::debug!(
            "Ignoring {} ingress {}-{} from {} on {}",
            protocol,
            from_port,
            to_port,
            cidr_ip,
            name
        );
        Ok(true)
    }

    pub fn revoke_security_group_named_ingress(
        &self,
        _name: &str,
        _owner: &str,
        _source_group: &str,
    ) -> Ec2Result<Infallible> {
        unsupported("revoke_security_group_named_ingress")
    }

    pub fn revoke_security_group_ip_ingress(
        &self,
        _name: &str,
        _from_port: u16,
        _to_port: u16,
        _protocol: &str,
        _cidr_ip: &str,
    ) -> Ec2Result<Infallible> {
        unsupported("revoke_security_group_ip_ingress")
    }
}
