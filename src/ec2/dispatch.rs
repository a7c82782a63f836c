//! Verb Dispatch
//!
//! Maps verb names to [`Ec2`] calls, with parameters and results carried as
//! JSON. Used by the scenario runner; any other caller that drives the fake
//! from data can use it too.

use serde::Serialize;
use serde_json::Value;

use super::{Ec2, LaunchParams, ACCEPTED_METHODS, UNSUPPORTED_METHODS};
use crate::error::{Ec2Error, Ec2Result};

/// Invoke a verb by name
pub fn invoke(ec2: &Ec2, method: &str, params: &Value) -> Ec2Result<Value> {
    tracing::debug!("invoke: method={}, params={}", method, params);

    if let Some(name) = UNSUPPORTED_METHODS.iter().find(|m| **m == method) {
        return Err(Ec2Error::NotImplemented(*name));
    }
    if ACCEPTED_METHODS.iter().any(|m| *m == method) {
        return invoke_accepted(ec2, method, params);
    }

    match method {
        // ===== Instances =====
        "describe_instances" => {
            let ids = get_param_list(params, "instance_ids");
            to_json(&ec2.describe_instances(&as_strs(&ids))?)
        },
        "launch_instances" => {
            let image_id = get_param_str(params, "image_id")?;
            to_json(&ec2.launch_instances(&image_id, launch_params(params)?)?)
        },
        "run_instances" => {
            let image_id = get_param_str(params, "image_id")?;
            let min_count = get_param_u32(params, "min_count")?.unwrap_or(1);
            let max_count = get_param_u32(params, "max_count")?.unwrap_or(min_count);
            to_json(&ec2.run_instances(&image_id, min_count, max_count, launch_params(params)?)?)
        },
        "terminate_instances" => {
            let ids = get_param_list(params, "instance_ids");
            to_json(&ec2.terminate_instances(&as_strs(&ids))?)
        },

        // ===== Security groups =====
        "describe_security_groups" => {
            let names = get_param_list(params, "group_names");
            to_json(&ec2.describe_security_groups(&as_strs(&names))?)
        },
        "create_security_group" => {
            let name = get_param_str(params, "name")?;
            let description = get_param_str_opt(params, "description").unwrap_or_default();
            to_json(&ec2.create_security_group(&name, &description)?)
        },
        "delete_security_group" => {
            let name = get_param_str(params, "name")?;
            to_json(&ec2.delete_security_group(&name)?)
        },

        // ===== Keys =====
        "describe_key_pairs" => {
            let names = get_param_list(params, "key_names");
            to_json(&ec2.describe_key_pairs(&as_strs(&names))?)
        },
        "create_key_pair" => {
            let name = get_param_str(params, "name")?;
            to_json(&ec2.create_key_pair(&name)?)
        },
        "delete_key_pair" => {
            let name = get_param_str(params, "name")?;
            to_json(&ec2.delete_key_pair(&name)?)
        },

        // ===== Elastic IPs =====
        "allocate_address" => to_json(&ec2.allocate_address()?),
        "associate_address" => {
            let instance_id = get_param_str(params, "instance_id")?;
            let public_ip = get_param_str(params, "public_ip")?;
            to_json(&ec2.associate_address(&instance_id, &public_ip)?)
        },
        "describe_addresses" => {
            let ips = get_param_list(params, "public_ips");
            to_json(&ec2.describe_addresses(&as_strs(&ips))?)
        },
        "disassociate_address" => {
            let public_ip = get_param_str(params, "public_ip")?;
            to_json(&ec2.disassociate_address(&public_ip)?)
        },
        "release_address" => {
            let public_ip = get_param_str(params, "public_ip")?;
            to_json(&ec2.release_address(&public_ip)?)
        },

        // ===== Availability zones =====
        "describe_availability_zones" => {
            let names = get_param_list(params, "zone_names");
            to_json(&ec2.describe_availability_zones(&as_strs(&names)))
        },

        // ===== EBS =====
        "describe_volumes" => {
            let ids = get_param_list(params, "volume_ids");
            to_json(&ec2.describe_volumes(&as_strs(&ids))?)
        },
        "create_volume" => {
            let snapshot_id = get_param_str_opt(params, "snapshot_id");
            let size = get_param_u32(params, "size")?;
            let zone = get_param_str_opt(params, "zone");
            to_json(&ec2.create_volume(snapshot_id.as_deref(), size, zone.as_deref())?)
        },
        "delete_volume" => {
            let volume_id = get_param_str(params, "volume_id")?;
            to_json(&ec2.delete_volume(&volume_id)?)
        },
        "attach_volume" => {
            let volume_id = get_param_str(params, "volume_id")?;
            let instance_id = get_param_str(params, "instance_id")?;
            let device = get_param_str(params, "device")?;
            to_json(&ec2.attach_volume(&volume_id, &instance_id, &device)?)
        },
        "detach_volume" => {
            let volume_id = get_param_str(params, "volume_id")?;
            to_json(&ec2.detach_volume(&volume_id)?)
        },
        "describe_snapshots" => {
            let ids = get_param_list(params, "snapshot_ids");
            to_json(&ec2.describe_snapshots(&as_strs(&ids))?)
        },
        "create_snapshot" => {
            let volume_id = get_param_str(params, "volume_id")?;
            to_json(&ec2.create_snapshot(&volume_id)?)
        },
        "delete_snapshot" => {
            let snapshot_id = get_param_str(params, "snapshot_id")?;
            to_json(&ec2.delete_snapshot(&snapshot_id)?)
        },

        _ => Err(Ec2Error::InvalidParameter(format!("Unknown method: {}", method))),
    }
}

fn invoke_accepted(ec2: &Ec2, method: &str, params: &Value) -> Ec2Result<Value> {
    let accepted = match method {
        "modify_image_launch_perm_add_users" => {
            let image_id = get_param_str(params, "image_id")?;
            let user_ids = get_param_list(params, "user_ids");
            ec2.modify_image_launch_perm_add_users(&image_id, &as_strs(&user_ids))?
        },
        "authorize_security_group_named_ingress" => {
            let name = get_param_str(params, "name")?;
            let owner = get_param_str_opt(params, "owner").unwrap_or_default();
            let source_group = get_param_str_opt(params, "source_group").unwrap_or_default();
            ec2.authorize_security_group_named_ingress(&name, &owner, &source_group)?
        },
        "authorize_security_group_ip_ingress" => {
            let name = get_param_str(params, "name")?;
            let from_port = get_param_port(params, "from_port")?;
            let to_port = get_param_port(params, "to_port")?;
            let protocol =
                get_param_str_opt(params, "protocol").unwrap_or_else(|| "tcp".to_string());
            let cidr_ip =
                get_param_str_opt(params, "cidr_ip").unwrap_or_else(|| "0.0.0.0/0".to_string());
            ec2.authorize_security_group_ip_ingress(&name, from_port, to_port, &protocol, &cidr_ip)?
        },
        _ => return Err(Ec2Error::InvalidParameter(format!("Unknown method: {}", method))),
    };
    Ok(Value::Bool(accepted))
}

fn launch_params(params: &Value) -> Ec2Result<LaunchParams> {
    let mut launch = LaunchParams::default();

    // An explicit list, even an empty one, replaces the default group
    if params.get("group_ids").is_some_and(|v| !v.is_null()) {
        launch.group_ids = get_param_list(params, "group_ids");
    }
    if let Some(count) = get_param_u32(params, "min_count")? {
        launch.min_count = count;
    }
    if let Some(count) = get_param_u32(params, "max_count")? {
        launch.max_count = count;
    }

    launch.key_name = get_param_str_opt(params, "key_name");
    launch.user_data = get_param_str_opt(params, "user_data").unwrap_or_default();
    launch.addressing_type = get_param_str_opt(params, "addressing_type");
    launch.instance_type = get_param_str_opt(params, "instance_type");
    launch.kernel_id = get_param_str_opt(params, "kernel_id");
    launch.ramdisk_id = get_param_str_opt(params, "ramdisk_id");
    launch.availability_zone = get_param_str_opt(params, "availability_zone");

    Ok(launch)
}

// =============================================================================
// Helpers
// =============================================================================

fn to_json<T: Serialize>(value: &T) -> Ec2Result<Value> {
    serde_json::to_value(value).map_err(|e| Ec2Error::InvalidParameter(e.to_string()))
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn get_param_str(params: &Value, key: &str) -> Ec2Result<String> {
    get_param_str_opt(params, key)
        .ok_or_else(|| Ec2Error::InvalidParameter(format!("Missing required parameter: {}", key)))
}

fn get_param_str_opt(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| {
            if let Value::Array(arr) = v {
                arr.first().and_then(|v| v.as_str())
            } else {
                v.as_str()
            }
        })
        .map(|s| s.to_string())
}

/// A list parameter; a bare string counts as a one-element list
fn get_param_list(params: &Value, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn get_param_u32(params: &Value, key: &str) -> Ec2Result<Option<u32>> {
    let Some(value) = params.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| {
        Ec2Error::InvalidParameter(format!("{} must be a non-negative integer", key))
    })
}

fn get_param_port(params: &Value, key: &str) -> Ec2Result<u16> {
    get_param_u32(params, key)?
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| Ec2Error::InvalidParameter(format!("{} must be a port number", key)))
}
