//! Scenario Runner
//!
//! A scenario is a YAML document that registers credential pairs and then
//! replays a list of verb calls against a fresh fake:
//!
//! ```yaml
//! accounts:
//!   - access_key: hello
//!     secret_key: world
//! steps:
//!   - call: launch_instances
//!     params: { image_id: ami-1 }
//!     save: { instance: /0/aws_instance_id }
//!   - call: create_volume
//!     params: { size: 10, zone: us-east-1a }
//!     save: { volume: /aws_id }
//!   - call: attach_volume
//!     params: { volume_id: $volume, instance_id: $instance, device: /dev/sda }
//!   - call: create_security_group
//!     params: { name: default }
//!     expect_error: InvalidGroup.Duplicate
//! ```
//!
//! Steps run with the first account's credentials unless they name their
//! own. `save` binds JSON pointers into a step's result to variables; a
//! parameter string of the form `$name` is replaced by the bound value.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account::MockAws;
use crate::ec2::{dispatch, Ec2};
use crate::error::Ec2Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub call: String,
    #[serde(default)]
    pub params: Value,
    /// Overrides the scenario's default credentials for this step
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Error code the step must fail with
    #[serde(default)]
    pub expect_error: Option<String>,
    /// Variable name -> JSON pointer into the result
    #[serde(default)]
    pub save: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub accounts: Vec<Credentials>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// What one step did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub call: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the step met its expectation
    pub passed: bool,
}

/// Outcomes of a whole scenario, in step order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.passed)
    }
}

/// Short code used to match `expect_error`
pub fn error_code(err: &Ec2Error) -> &'static str {
    match err {
        Ec2Error::Aws(e) => e.code.as_str(),
        Ec2Error::NotImplemented(_) => "NotImplemented",
        Ec2Error::InvalidParameter(_) => "InvalidParameter",
    }
}

impl Scenario {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid scenario {}", path.display()))
    }

    /// Register the scenario's accounts on `aws` and replay every step
    pub fn run(&self, aws: &MockAws) -> Report {
        for account in &self.accounts {
            aws.register(&account.access_key, &account.secret_key);
        }

        let default_ec2 = match self.accounts.first() {
            Some(c) => aws.ec2(&c.access_key, &c.secret_key),
            None => aws.ec2_from_env(),
        };

        let mut vars = BTreeMap::new();
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let ec2 = match &step.credentials {
                    Some(c) => aws.ec2(&c.access_key, &c.secret_key),
                    None => default_ec2.clone(),
                };
                run_step(&ec2, index, step, &mut vars)
            })
            .collect();

        Report { steps }
    }
}

fn run_step(
    ec2: &Ec2,
    index: usize,
    step: &Step,
    vars: &mut BTreeMap<String, Value>,
) -> StepOutcome {
    let mut outcome = StepOutcome {
        step: index,
        call: step.call.clone(),
        result: None,
        error_code: None,
        error: None,
        passed: false,
    };

    let params = match substitute(&step.params, vars) {
        Ok(params) => params,
        Err(name) => {
            tracing::warn!("Step {} references unbound variable ${}", index, name);
            outcome.error = Some(format!("unbound variable ${}", name));
            return outcome;
        },
    };

    match dispatch::invoke(ec2, &step.call, &params) {
        Ok(result) => {
            for (name, pointer) in &step.save {
                match result.pointer(pointer) {
                    Some(value) => {
                        vars.insert(name.clone(), value.clone());
                    },
                    None => tracing::warn!(
                        "Step {}: {} has nothing at {} for ${}",
                        index,
                        step.call,
                        pointer,
                        name
                    ),
                }
            }
            outcome.passed = step.expect_error.is_none();
            outcome.result = Some(result);
        },
        Err(err) => {
            let code = error_code(&err);
            outcome.passed = step.expect_error.as_deref() == Some(code);
            outcome.error_code = Some(code.to_string());
            outcome.error = Some(err.to_string());
        },
    }

    if !outcome.passed {
        tracing::info!("Step {} ({}) did not meet its expectation", index, step.call);
    }
    outcome
}

/// Replace `$name` strings with bound values; `Err` carries the first
/// unbound name
fn substitute(value: &Value, vars: &BTreeMap<String, Value>) -> std::result::Result<Value, String> {
    match value {
        Value::String(s) => match s.strip_prefix('$') {
            Some(name) => vars.get(name).cloned().ok_or_else(|| name.to_string()),
            None => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|v| substitute(v, vars))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), substitute(v, vars)?)))
            .collect::<std::result::Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        _ => Ok(value.clone()),
    }
}
