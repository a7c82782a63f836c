//! End-to-end tests through the public facade
//!
//! Each test owns its own `MockAws`, so they run in parallel without
//! sharing state.

use mockec2::assertions::AccountAssertions;
use mockec2::config::{DoubleAttachPolicy, UnknownGroupPolicy};
use mockec2::ec2::{InstanceRecord, LaunchParams};
use mockec2::store::{InstanceState, VolumeStatus};
use mockec2::{AwsErrorCode, Config, Ec2, MockAws};

fn setup() -> (MockAws, Ec2) {
    let aws = MockAws::default();
    aws.register("hello", "world");
    let ec2 = aws.ec2("hello", "world");
    (aws, ec2)
}

fn account(aws: &MockAws) -> AccountAssertions {
    AccountAssertions::new(aws, "hello").unwrap()
}

fn is_ip(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| p.parse::<u8>().is_ok())
}

fn is_hex_id(value: &str, prefix: &str) -> bool {
    value
        .strip_prefix(prefix)
        .is_some_and(|hex| hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

// =============================================================================
// Accounts
// =============================================================================

#[test]
fn test_register_and_authenticate() {
    let aws = MockAws::default();
    let id = aws.register("hello", "world");

    assert_eq!(aws.account("hello").map(|a| a.id), Some(id));
    assert_eq!(aws.authenticate("hello", "world"), Ok(id));
    assert_eq!(
        aws.authenticate("goodbye", "world").unwrap_err().code,
        AwsErrorCode::AuthFailure
    );
    assert_eq!(
        aws.authenticate("hello", "daffodil").unwrap_err().code,
        AwsErrorCode::AuthFailure
    );
}

#[test]
fn test_reset_isolates_runs() {
    let (aws, ec2) = setup();
    ec2.create_key_pair("kp").unwrap();

    aws.reset();

    assert!(aws.account("hello").is_none());
    assert!(ec2.describe_key_pairs(&[]).is_err());

    aws.register("hello", "world");
    assert!(ec2.describe_key_pairs(&[]).unwrap().is_empty());
}

#[test]
fn test_accounts_do_not_see_each_other() {
    let (aws, alice) = setup();
    aws.register("bob", "secret");
    let bob = aws.ec2("bob", "secret");

    let ip = alice.allocate_address().unwrap();
    let volume = alice.create_volume(None, Some(1), None).unwrap();

    assert!(bob.describe_addresses(&[]).unwrap().is_empty());
    assert!(bob.describe_volumes(&[]).unwrap().is_empty());
    assert_eq!(
        bob.release_address(&ip).unwrap_err().code(),
        Some(AwsErrorCode::AuthFailure)
    );
    assert_eq!(bob.delete_volume(&volume.aws_id).unwrap(), None);
    assert_eq!(alice.describe_volumes(&[]).unwrap().len(), 1);
}

// =============================================================================
// Key pairs
// =============================================================================

#[test]
fn test_key_pairs() {
    let (aws, ec2) = setup();
    ec2.create_key_pair("my-keypair").unwrap();
    ec2.create_key_pair("my-keypair2").unwrap();

    assert_eq!(ec2.describe_key_pairs(&[]).unwrap().len(), 2);
    let described = ec2.describe_key_pairs(&["my-keypair"]).unwrap();
    assert_eq!(described.len(), 1);
    assert_eq!(described[0].aws_key_name, "my-keypair");

    let err = ec2.create_key_pair("my-keypair").unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::DuplicateKeypair));

    assert!(ec2.delete_key_pair("my-keypair").unwrap());
    account(&aws).only_has_keypairs(&["my-keypair2"]).unwrap();
}

#[test]
fn test_same_names_in_two_accounts() {
    let (aws, alice) = setup();
    aws.register("bob", "secret");
    let bob = aws.ec2("bob", "secret");

    let alices_key = alice.create_key_pair("k1").unwrap();
    let bobs_key = bob.create_key_pair("k1").unwrap();
    assert_eq!(alices_key.aws_key_name, bobs_key.aws_key_name);

    assert!(alice.create_security_group("web", "alice's web").unwrap());
    assert!(bob.create_security_group("web", "bob's web").unwrap());

    assert_eq!(
        alice.create_key_pair("k1").unwrap_err().code(),
        Some(AwsErrorCode::DuplicateKeypair)
    );
    assert_eq!(
        bob.create_security_group("web", "again").unwrap_err().code(),
        Some(AwsErrorCode::DuplicateGroup)
    );

    account(&aws).only_has_keypairs(&["k1"]).unwrap();
    account(&aws)
        .has_security_group("web", Some("alice's web"))
        .unwrap();
    let bobs = AccountAssertions::new(&aws, "bob").unwrap();
    bobs.only_has_keypairs(&["k1"]).unwrap();
    bobs.has_security_group("web", Some("bob's web")).unwrap();

    assert!(bob.delete_key_pair("k1").unwrap());
    account(&aws).only_has_keypairs(&["k1"]).unwrap();
}

// =============================================================================
// Elastic IPs
// =============================================================================

#[test]
fn test_allocate_addresses_up_to_limit() {
    let (aws, ec2) = setup();
    let mut held = Vec::new();
    for _ in 0..5 {
        let ip = ec2.allocate_address().unwrap();
        assert!(is_ip(&ip), "{}", ip);
        held.push(ip);
    }

    let err = ec2.allocate_address().unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::AddressLimitExceeded));

    let refs: Vec<&str> = held.iter().map(String::as_str).collect();
    account(&aws).only_has_addresses(&refs).unwrap();
}

#[test]
fn test_release_frees_quota() {
    let (aws, ec2) = setup();
    let first = ec2.allocate_address().unwrap();
    let second = ec2.allocate_address().unwrap();

    assert!(ec2.release_address(&first).unwrap());
    account(&aws).only_has_addresses(&[second.as_str()]).unwrap();

    let err = ec2.release_address("10.10.10.10").unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::AuthFailure));
    assert!(err.to_string().contains("10.10.10.10"));

    for _ in 0..4 {
        ec2.allocate_address().unwrap();
    }
    assert!(ec2.allocate_address().is_err());
}

#[test]
fn test_associate_and_disassociate_address() {
    let (_, ec2) = setup();
    let first = ec2.allocate_address().unwrap();
    let second = ec2.allocate_address().unwrap();
    let instance = ec2.launch_instances("foobar", LaunchParams::default()).unwrap()[0]
        .aws_instance_id
        .clone();

    assert!(ec2.associate_address(&instance, &first).unwrap());
    let described = ec2.describe_addresses(&[first.as_str()]).unwrap();
    assert_eq!(described[0].instance_id.as_deref(), Some(instance.as_str()));

    // Moving the instance to another address clears the first one
    ec2.associate_address(&instance, &second).unwrap();
    let described = ec2.describe_addresses(&[first.as_str()]).unwrap();
    assert_eq!(described[0].instance_id, None);

    assert!(ec2.disassociate_address(&second).unwrap());
    assert!(ec2
        .describe_addresses(&[])
        .unwrap()
        .iter()
        .all(|a| a.instance_id.is_none()));

    let err = ec2.associate_address("i-nothere", &first).unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::InstanceNotFound));
}

// =============================================================================
// Security groups
// =============================================================================

#[test]
fn test_security_groups() {
    let (aws, ec2) = setup();
    ec2.create_security_group("my-first-group", "my-first-group-desc").unwrap();

    let checks = account(&aws);
    checks.has_security_group("default", None).unwrap();
    checks
        .has_security_group("my-first-group", Some("my-first-group-desc"))
        .unwrap();

    let err = ec2
        .create_security_group("my-first-group", "again")
        .unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::DuplicateGroup));

    ec2.create_security_group("my-sec-group", "my-sec-group-desc").unwrap();
    let groups = ec2.describe_security_groups(&[]).unwrap();
    assert_eq!(groups.len(), 3);
    let owner = aws.account("hello").unwrap().id;
    assert!(groups.iter().all(|g| g.aws_owner == owner && g.aws_perms.is_empty()));
}

#[test]
fn test_deleting_a_group_drops_memberships() {
    let (aws, ec2) = setup();
    ec2.create_security_group("web", "web tier").unwrap();
    let launched = ec2
        .launch_instances("ami-1", LaunchParams::default().with_groups(["default", "web"]))
        .unwrap();
    let id = &launched[0].aws_instance_id;

    account(&aws).instance_has_groups(id, &["default", "web"]).unwrap();

    assert!(ec2.delete_security_group("web").unwrap());
    account(&aws).instance_has_groups(id, &["default"]).unwrap();
}

// =============================================================================
// Instances
// =============================================================================

#[test]
fn test_launch_creates_valid_instance() {
    let (aws, ec2) = setup();
    let owner = aws.account("hello").unwrap().id;

    let launched = ec2.launch_instances("foobar", LaunchParams::default()).unwrap();
    assert_eq!(launched.len(), 1);
    let instance = &launched[0];

    assert_eq!(instance.aws_image_id, "foobar");
    assert_eq!(instance.aws_owner, owner);
    assert_eq!(instance.aws_state, InstanceState::Running);
    assert_eq!(instance.aws_instance_type, "m1.small");
    assert_eq!(instance.aws_groups, vec!["default"]);
    assert!(is_hex_id(&instance.aws_instance_id, "i-"));
    assert!(is_hex_id(&instance.aws_reservation_id, "r-"));
    assert!(is_hex_id(&instance.aws_kernel_id, "aki-"));
    assert!(is_hex_id(&instance.aws_ramdisk_id, "ari-"));

    account(&aws)
        .has_instance(|i| i.id == instance.aws_instance_id && i.account == owner)
        .unwrap();
    account(&aws)
        .instance_has_groups(&instance.aws_instance_id, &["default"])
        .unwrap();
}

#[test]
fn test_describe_instances() {
    let (_, ec2) = setup();
    assert!(ec2.describe_instances(&[]).unwrap().is_empty());

    let launched = ec2.launch_instances("foobar", LaunchParams::default()).unwrap();
    let described = ec2.describe_instances(&[]).unwrap();
    assert_eq!(described, vec![InstanceRecord::Launched(launched[0].clone())]);
}

#[test]
fn test_launch_with_keypair() {
    let (_, ec2) = setup();
    let err = ec2
        .launch_instances("ami-1", LaunchParams::default().with_key_name("deploy"))
        .unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::KeypairNotFound));

    ec2.create_key_pair("deploy").unwrap();
    let launched = ec2
        .launch_instances("ami-1", LaunchParams::default().with_key_name("deploy"))
        .unwrap();
    assert_eq!(launched[0].ssh_key_name, "deploy");
}

#[test]
fn test_unknown_group_policy() {
    let (aws, ec2) = setup();
    let params = LaunchParams::default().with_groups(["default", "ghost"]);

    let launched = ec2.launch_instances("ami-1", params.clone()).unwrap();
    assert_eq!(launched[0].aws_groups, vec!["default"]);

    aws.set_config(Config::default().with_unknown_group_policy(UnknownGroupPolicy::Reject));
    let err = ec2.launch_instances("ami-1", params).unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::GroupNotFound));
    assert_eq!(ec2.describe_instances(&[]).unwrap().len(), 1);
}

#[test]
fn test_terminate_selected_instances() {
    let (aws, ec2) = setup();
    let alice = ec2.launch_instances("alice", LaunchParams::default()).unwrap().remove(0);
    let cooper = ec2.launch_instances("cooper", LaunchParams::default()).unwrap().remove(0);

    let terminated = ec2
        .terminate_instances(&[alice.aws_instance_id.as_str()])
        .unwrap();
    assert_eq!(terminated.len(), 1);
    assert_eq!(terminated[0].aws_image_id(), "alice");
    assert_eq!(terminated[0].aws_owner(), aws.account("hello").unwrap().id);
    assert_eq!(terminated[0].aws_state(), InstanceState::ShuttingDown);

    let remaining = ec2.describe_instances(&[]).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].aws_instance_id(), Some(cooper.aws_instance_id.as_str()));

    ec2.terminate_instances(&[cooper.aws_instance_id.as_str()]).unwrap();
    assert!(ec2.describe_instances(&[]).unwrap().is_empty());
}

#[test]
fn test_terminate_clears_address_association() {
    let (_, ec2) = setup();
    let ip = ec2.allocate_address().unwrap();
    let id = ec2.launch_instances("ami-1", LaunchParams::default()).unwrap()[0]
        .aws_instance_id
        .clone();
    ec2.associate_address(&id, &ip).unwrap();

    ec2.terminate_instances(&[id.as_str()]).unwrap();

    let described = ec2.describe_addresses(&[]).unwrap();
    assert_eq!(described.len(), 1);
    assert_eq!(described[0].instance_id, None);
}

// =============================================================================
// Volumes and snapshots
// =============================================================================

#[test]
fn test_volume_attach_terminate_cascade() {
    let (aws, ec2) = setup();
    let instance = ec2.launch_instances("img1", LaunchParams::default()).unwrap().remove(0);
    let volume = ec2.create_volume(None, Some(10), Some("z1")).unwrap();
    assert_eq!(volume.aws_status, VolumeStatus::Creating);

    let attached = ec2
        .attach_volume(&volume.aws_id, &instance.aws_instance_id, "/dev/sda")
        .unwrap();
    assert_eq!(attached.aws_instance_id.as_deref(), Some(instance.aws_instance_id.as_str()));
    assert_eq!(attached.aws_status, VolumeStatus::Attached);
    assert_eq!(attached.aws_device.as_deref(), Some("/dev/sda"));
    assert!(attached.aws_attached_at.is_some());

    ec2.terminate_instances(&[instance.aws_instance_id.as_str()]).unwrap();

    let after = ec2.describe_volumes(&[volume.aws_id.as_str()]).unwrap();
    assert_eq!(after[0].aws_status, VolumeStatus::Available);
    assert_eq!(after[0].aws_instance_id, None);
    account(&aws)
        .has_volumes(&[], |v| v.status == VolumeStatus::Available)
        .unwrap();
    assert!(ec2
        .describe_instances(&[instance.aws_instance_id.as_str()])
        .unwrap()
        .is_empty());
}

#[test]
fn test_terminate_without_volumes_leaves_volumes_alone() {
    let (_, ec2) = setup();
    let instance = ec2.launch_instances("img1", LaunchParams::default()).unwrap().remove(0);
    let volume = ec2.create_volume(Some("snap-1"), Some(5), Some("z1")).unwrap();
    let before = ec2.describe_volumes(&[]).unwrap();

    ec2.terminate_instances(&[instance.aws_instance_id.as_str()]).unwrap();

    let after = ec2.describe_volumes(&[]).unwrap();
    assert_eq!(after, before);
    assert_eq!(after[0].aws_id, volume.aws_id);
    assert_eq!(after[0].aws_status, VolumeStatus::Creating);
    assert_eq!(after[0].aws_instance_id, None);
    assert_eq!(after[0].aws_attached_at, None);
}

#[test]
fn test_detach_and_delete_volume() {
    let (aws, ec2) = setup();
    let instance = ec2.launch_instances("pantz", LaunchParams::default()).unwrap().remove(0);
    let volume = ec2.create_volume(Some("snap-bob"), Some(10), Some("pink")).unwrap();
    ec2.attach_volume(&volume.aws_id, &instance.aws_instance_id, "/dev/sda")
        .unwrap();

    let detached = ec2.detach_volume(&volume.aws_id).unwrap();
    assert_eq!(detached.aws_status, VolumeStatus::Available);
    assert_eq!(detached.aws_instance_id, None);

    assert!(ec2.delete_volume(&volume.aws_id).unwrap().is_some());
    assert!(account(&aws).has_volumes(&[volume.aws_id.as_str()], |_| true).is_err());
}

#[test]
fn test_attach_requires_known_volume_and_instance() {
    let (_, ec2) = setup();
    let volume = ec2.create_volume(None, Some(1), None).unwrap();

    let err = ec2.attach_volume("vol-ghost", "i-ghost", "/dev/sda").unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::VolumeNotFound));

    let err = ec2.attach_volume(&volume.aws_id, "i-ghost", "/dev/sda").unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::InstanceNotFound));
}

#[test]
fn test_double_attach_policy() {
    let (aws, ec2) = setup();
    let first = ec2.launch_instances("a", LaunchParams::default()).unwrap().remove(0);
    let second = ec2.launch_instances("b", LaunchParams::default()).unwrap().remove(0);
    let volume = ec2.create_volume(None, Some(1), None).unwrap();

    ec2.attach_volume(&volume.aws_id, &first.aws_instance_id, "/dev/sda").unwrap();
    let moved = ec2
        .attach_volume(&volume.aws_id, &second.aws_instance_id, "/dev/sdb")
        .unwrap();
    assert_eq!(moved.aws_instance_id.as_deref(), Some(second.aws_instance_id.as_str()));

    aws.set_config(Config::default().with_double_attach_policy(DoubleAttachPolicy::Reject));
    let err = ec2
        .attach_volume(&volume.aws_id, &first.aws_instance_id, "/dev/sda")
        .unwrap_err();
    assert_eq!(err.code(), Some(AwsErrorCode::VolumeInUse));
}

#[test]
fn test_volumes_by_size() {
    let (aws, ec2) = setup();
    let a = ec2.create_volume(Some("snap-foo"), Some(10), Some("purple")).unwrap();
    let b = ec2.create_volume(Some("snap-foo"), Some(10), Some("yellow")).unwrap();
    let ids = [a.aws_id.as_str(), b.aws_id.as_str()];

    account(&aws).has_volumes(&ids, |v| v.size == Some(10)).unwrap();
    account(&aws).only_has_volumes(&ids, |v| v.size == Some(10)).unwrap();
}

#[test]
fn test_snapshots() {
    let (_, ec2) = setup();
    let volume = ec2.create_volume(None, Some(10), Some("purple")).unwrap();
    let snapshot = ec2.create_snapshot(&volume.aws_id).unwrap();

    assert!(is_hex_id(&snapshot.aws_id, "snap-"));
    assert_eq!(snapshot.aws_progress, "80%");

    let described = ec2.describe_snapshots(&[]).unwrap();
    assert_eq!(described.len(), 1);
    assert_eq!(described[0].aws_progress, "100%");

    assert!(ec2.delete_snapshot(&snapshot.aws_id).unwrap().is_some());
    assert!(ec2.describe_snapshots(&[]).unwrap().is_empty());
}

// =============================================================================
// Unmodeled verbs
// =============================================================================

#[test]
fn test_unmodeled_verbs_are_distinguishable() {
    let (_, ec2) = setup();
    let err = ec2.describe_images(&[]).unwrap_err();
    assert!(err.is_not_implemented());
    assert_eq!(err.code(), None);

    assert!(ec2
        .authorize_security_group_ip_ingress("default", 80, 80, "tcp", "0.0.0.0/0")
        .unwrap());
}
