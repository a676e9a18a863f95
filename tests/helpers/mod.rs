use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use rsmachine::RsmachineError;
use rsmachine::auth::{AuthConfigurer, AuthOptions};
use rsmachine::channel::CommandChannel;
use rsmachine::config::{Profile, load_profile};
use rsmachine::driver::Driver;
use rsmachine::provision::{ProvisionContext, Provisioner};
use rsmachine::swarm::{SwarmConfigurer, SwarmOptions};
use rsmachine::waiter::Waiter;

/// Wraps a YAML literal; keeps profile fixtures visually distinct in tests.
#[macro_export]
macro_rules! yaml {
    ($text:expr) => {
        $text
    };
}

/// Writes `yaml` to a temporary `machine.yml` and loads it.
#[allow(dead_code)]
pub fn load_profile_from_yaml(yaml: &str) -> Result<Profile> {
    let dir = tempfile::tempdir()?;
    let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("machine.yml"))
        .map_err(|p| anyhow::anyhow!("non UTF-8 temp path: {}", p.display()))?;
    std::fs::write(&path, yaml)?;
    Ok(load_profile(&path)?)
}

/// Driver for a machine that does not exist.
#[allow(dead_code)]
pub struct FakeDriver {
    pub machine_name: String,
    pub ip: String,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self {
            machine_name: "test-machine".to_string(),
            ip: "127.0.0.1".to_string(),
        }
    }
}

impl Driver for FakeDriver {
    fn machine_name(&self) -> &str {
        &self.machine_name
    }

    fn driver_name(&self) -> &str {
        "fake"
    }

    fn ip(&self) -> Result<String> {
        Ok(self.ip.clone())
    }
}

#[allow(dead_code)]
enum Reply {
    Output(String),
    Fail,
}

/// Scripted remote host.
///
/// Every command is recorded. Commands matching a scripted rule get that
/// reply; file uploads (`tee`), unit comparisons (`cmp -s`) and moves
/// (`mv -f`) operate on an in-memory filesystem; anything else succeeds
/// with empty output.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeRemote {
    commands: Mutex<Vec<String>>,
    rules: Mutex<Vec<(String, Reply)>>,
    files: Mutex<HashMap<String, String>>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remote host whose os-release probe returns `content`.
    pub fn with_os_release(content: &str) -> Arc<Self> {
        let remote = Self::default();
        remote.respond("os-release", content);
        Arc::new(remote)
    }

    /// Replies `output` to commands containing `pattern`.
    pub fn respond(&self, pattern: &str, output: &str) {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), Reply::Output(output.to_string())));
    }

    /// Fails commands containing `pattern`.
    pub fn fail(&self, pattern: &str) {
        self.rules.lock().unwrap().push((pattern.to_string(), Reply::Fail));
    }

    /// Records a marker line without running anything.
    pub fn note(&self, marker: &str) {
        self.commands.lock().unwrap().push(marker.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(pattern)).count()
    }

    /// Index of the first command containing `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.commands().iter().position(|c| c.contains(pattern))
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn put_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    fn apply_filesystem(&self, command: &str) -> Option<String> {
        let words = shell_words(command);
        let mut files = self.files.lock().unwrap();

        if let Some(tee) = words.iter().position(|w| w == "tee") {
            let printf = words.iter().position(|w| w == "printf")?;
            let content = words.get(printf + 2)?.clone();
            let path = words.get(tee + 1)?.clone();
            if path != "-a" {
                files.insert(path, content);
            }
            return Some(String::new());
        }

        if command.starts_with("if sudo cmp -s ") {
            let dst = words.get(4)?.clone();
            let staged = words.get(5)?.trim_end_matches(';').to_string();
            let same = files.contains_key(&dst) && files.get(&dst) == files.get(&staged);
            if same {
                files.remove(&staged);
                return Some("unchanged".to_string());
            }
            return Some("changed".to_string());
        }

        if command.starts_with("sudo mv -f ") {
            let from = words.get(3)?;
            let to = words.get(4)?.clone();
            let content = files.remove(from)?;
            files.insert(to, content);
            return Some(String::new());
        }

        None
    }
}

impl CommandChannel for FakeRemote {
    fn run(&self, command: &str) -> Result<String> {
        self.commands.lock().unwrap().push(command.to_string());

        let rules = self.rules.lock().unwrap();
        if let Some((_, reply)) = rules.iter().find(|(pattern, _)| command.contains(pattern.as_str())) {
            return match reply {
                Reply::Output(output) => Ok(output.trim().to_string()),
                Reply::Fail => Err(RsmachineError::Execution {
                    command: command.to_string(),
                    status: "exit status: 1".to_string(),
                }
                .into()),
            };
        }
        drop(rules);

        Ok(self.apply_filesystem(command).unwrap_or_default())
    }
}

/// Splits a command line into words, honouring single quotes and backslashes.
#[allow(dead_code)]
fn shell_words(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    current.push(q);
                }
            }
            '\\' => {
                in_word = true;
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

/// Auth configurer that only records that it ran and what it saw.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingAuth {
    pub remote: Option<Arc<FakeRemote>>,
    pub seen: Mutex<Vec<AuthOptions>>,
}

impl AuthConfigurer for RecordingAuth {
    fn configure_auth(&self, provisioner: &mut dyn Provisioner) -> Result<()> {
        if let Some(remote) = &self.remote {
            remote.note("<configure auth>");
        }
        self.seen.lock().unwrap().push(provisioner.auth_options().clone());
        Ok(())
    }
}

/// Swarm configurer that only records that it ran and what it saw.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSwarm {
    pub remote: Option<Arc<FakeRemote>>,
    pub seen: Mutex<Vec<SwarmOptions>>,
}

impl SwarmConfigurer for RecordingSwarm {
    fn configure_swarm(
        &self,
        _provisioner: &dyn Provisioner,
        swarm: &SwarmOptions,
        _auth: &AuthOptions,
    ) -> Result<()> {
        if let Some(remote) = &self.remote {
            remote.note("<configure swarm>");
        }
        self.seen.lock().unwrap().push(swarm.clone());
        Ok(())
    }
}

/// Context bound to `remote` with a fast, three-attempt waiter and the
/// built-in configurers.
#[allow(dead_code)]
pub fn test_context(remote: Arc<FakeRemote>) -> ProvisionContext {
    ProvisionContext::new(Arc::new(FakeDriver::default()), remote)
        .with_waiter(Waiter::new(3, Duration::ZERO))
}

/// Like [`test_context`], with recording configurers that log into `remote`.
#[allow(dead_code)]
pub fn recording_context(
    remote: Arc<FakeRemote>,
) -> (ProvisionContext, Arc<RecordingAuth>, Arc<RecordingSwarm>) {
    let auth = Arc::new(RecordingAuth {
        remote: Some(Arc::clone(&remote)),
        ..Default::default()
    });
    let swarm = Arc::new(RecordingSwarm {
        remote: Some(Arc::clone(&remote)),
        ..Default::default()
    });
    let context = test_context(remote)
        .with_auth_configurer(auth.clone())
        .with_swarm_configurer(swarm.clone());
    (context, auth, swarm)
}
