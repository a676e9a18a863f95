mod helpers;

use anyhow::Result;
use helpers::{FakeRemote, test_context};
use rsmachine::RsmachineError;
use rsmachine::auth::AuthOptions;
use rsmachine::engine::EngineOptions;
use rsmachine::provision::{
    Detector, FamilyTraits, InitSystem, PackageManager, ProvisionContext, Provisioner,
    ProvisionerBase, Registry, StorageDriverDefault, UnitTemplate, run_pipeline,
};
use rsmachine::swarm::SwarmOptions;

static FAKE_TRAITS: FamilyTraits = FamilyTraits {
    package_manager: PackageManager::None,
    init_system: InitSystem::Systemd,
    unit_template: UnitTemplate::Systemd,
    storage_driver: StorageDriverDefault::Fixed("vfs"),
    base_packages: &[],
    daemon_package: None,
    options_dir: "/etc/docker",
    unit_path: "/etc/systemd/system/docker.service",
};

/// Provisioner that accepts every host.
struct FakeProvisioner {
    name: &'static str,
    base: ProvisionerBase,
}

impl Provisioner for FakeProvisioner {
    fn name(&self) -> &'static str {
        self.name
    }

    fn base(&self) -> &ProvisionerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ProvisionerBase {
        &mut self.base
    }

    fn traits(&self) -> &'static FamilyTraits {
        &FAKE_TRAITS
    }

    fn compatible_with_host(&self) -> bool {
        true
    }

    fn provision(&mut self, swarm: SwarmOptions, auth: AuthOptions, engine: EngineOptions) -> Result<()> {
        run_pipeline(self, swarm, auth, engine)
    }
}

fn first(context: ProvisionContext) -> Box<dyn Provisioner> {
    Box::new(FakeProvisioner {
        name: "first",
        base: ProvisionerBase::new(context, &FAKE_TRAITS),
    })
}

fn second(context: ProvisionContext) -> Box<dyn Provisioner> {
    Box::new(FakeProvisioner {
        name: "second",
        base: ProvisionerBase::new(context, &FAKE_TRAITS),
    })
}

fn os_release(id: &str, id_like: &str, version_id: &str) -> String {
    format!(
        "NAME=\"Test\"\nID={}\nID_LIKE=\"{}\"\nVERSION_ID=\"{}\"\n",
        id, id_like, version_id
    )
}

fn detect_builtin(content: &str) -> Result<Box<dyn Provisioner>> {
    let remote = FakeRemote::with_os_release(content);
    let registry = Registry::builtin();
    Detector::new(&registry).detect(&test_context(remote))
}

#[test]
fn test_first_registered_compatible_wins() {
    let mut registry = Registry::new();
    registry.register("first", first);
    registry.register("second", second);

    let remote = FakeRemote::with_os_release(&os_release("anything", "", "1"));
    let provisioner = Detector::new(&registry).detect(&test_context(remote)).unwrap();

    assert_eq!(provisioner.name(), "first");
}

#[test]
fn test_detection_sets_os_release_info() {
    let provisioner = detect_builtin(&os_release("debian", "", "12")).unwrap();

    assert_eq!(provisioner.name(), "debian");
    let release = provisioner.os_release().expect("os release should be cached");
    assert_eq!(release.id, "debian");
    assert_eq!(release.version_id, "12");
}

#[test]
fn test_builtin_detection_table() {
    let cases = [
        (os_release("arch", "", ""), "arch"),
        (os_release("manjaro", "arch", ""), "arch"),
        (os_release("buildroot", "", "2023.02"), "buildroot"),
        (os_release("centos", "rhel fedora", "7"), "centos"),
        (os_release("raspbian", "debian", "11"), "debian"),
        (os_release("fedora", "", "39"), "fedora"),
        (os_release("rhel", "fedora", "9.3"), "redhat"),
        (os_release("opensuse-leap", "suse opensuse", "15.5"), "suse"),
        (os_release("sles", "suse", "12.5"), "suse"),
        (os_release("ubuntu", "debian", "22.04"), "ubuntu-systemd"),
        (os_release("ubuntu", "debian", "15.04"), "ubuntu-systemd"),
        (os_release("ubuntu", "debian", "14.04"), "ubuntu-upstart"),
    ];

    for (content, expected) in cases {
        let provisioner = detect_builtin(&content).unwrap();
        assert_eq!(provisioner.name(), expected, "os-release:\n{}", content);
    }
}

#[test]
fn test_no_compatible_provisioner_names_os_id() {
    let err = detect_builtin(&os_release("plan9", "", "4")).unwrap_err();

    match err.downcast_ref::<RsmachineError>() {
        Some(RsmachineError::NoCompatibleProvisioner { id }) => assert_eq!(id, "plan9"),
        other => panic!("expected NoCompatibleProvisioner, got: {:?}", other),
    }
}

#[test]
fn test_ubuntu_without_version_is_not_compatible() {
    let err = detect_builtin(&os_release("ubuntu", "debian", "")).unwrap_err();
    assert!(err.to_string().contains("no compatible provisioner"), "got: {}", err);
}

#[test]
fn test_probe_failure_is_fatal_and_not_retried() {
    let remote = FakeRemote::new();
    remote.fail("os-release");
    let registry = Registry::builtin();

    let err = Detector::new(&registry).detect(&test_context(remote.clone())).unwrap_err();

    assert!(
        matches!(err.downcast_ref::<RsmachineError>(), Some(RsmachineError::Probe(_))),
        "expected Probe error, got: {:#}",
        err
    );
    assert_eq!(remote.count("os-release"), 1);
    assert_eq!(remote.commands().len(), 1);
}

#[test]
fn test_registry_get_returns_constructor() {
    let mut registry = Registry::new();
    registry.register("first", first);

    let entry = registry.get("first").expect("registered entry");
    let provisioner = (entry.new)(test_context(FakeRemote::new()));

    assert_eq!(entry.name, "first");
    assert_eq!(provisioner.name(), "first");
    assert!(registry.get("second").is_none());
}

#[test]
fn test_fake_provisioner_runs_shared_pipeline() {
    let remote = FakeRemote::new();
    let mut provisioner = first(test_context(remote.clone()));

    provisioner
        .provision(SwarmOptions::default(), AuthOptions::default(), EngineOptions::default())
        .unwrap();

    assert_eq!(provisioner.engine_options().storage_driver, "vfs");
    assert_eq!(remote.count("sudo docker version"), 1);
}
