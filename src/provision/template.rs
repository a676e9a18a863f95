//! Daemon unit rendering.
//!
//! Engine values are escaped for the target format before they enter the
//! template context; the templates themselves never escape anything.

use serde::Serialize;
use tera::{Context, Tera};

use crate::auth::AuthOptions;
use crate::engine::EngineOptions;
use crate::error::RsmachineError;

/// Escaping rules of a unit format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaping {
    /// systemd unit files: `%` starts a specifier and must be doubled.
    Systemd,
    /// Shell-sourced files such as `/etc/default/docker`.
    Shell,
}

impl Escaping {
    /// Escapes one `KEY=VALUE` environment entry.
    ///
    /// The value is wrapped in double quotes; an entry without `=` is quoted whole.
    pub fn env_entry(self, entry: &str) -> String {
        match entry.split_once('=') {
            Some((key, value)) => format!("{}={}", key, self.quote(value)),
            None => self.quote(entry),
        }
    }

    fn quote(self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('"');
        for c in value.chars() {
            match (self, c) {
                (_, '"') => out.push_str("\\\""),
                (_, '\\') => out.push_str("\\\\"),
                (Self::Systemd, '%') => out.push_str("%%"),
                (Self::Systemd, '\n') => out.push_str("\\n"),
                (Self::Shell, '$') => out.push_str("\\$"),
                (Self::Shell, '`') => out.push_str("\\`"),
                (_, c) => out.push(c),
            }
        }
        out.push('"');
        out
    }

    /// Escapes a value placed verbatim on the daemon command line.
    pub fn flag_value(self, value: &str) -> String {
        match self {
            Self::Systemd => value.replace('%', "%%"),
            Self::Shell => value.replace('\'', r"'\''"),
        }
    }
}

/// Values available to the unit templates, already escaped.
#[derive(Debug, Clone, Serialize)]
pub struct EngineConfigContext {
    pub docker_port: u16,
    pub tls: bool,
    pub ca_cert_path: String,
    pub server_cert_path: String,
    pub server_key_path: String,
    pub env: Vec<String>,
    pub labels: Vec<String>,
    pub insecure_registry: Vec<String>,
    pub registry_mirror: Vec<String>,
    pub storage_driver: String,
    pub arbitrary_flags: Vec<String>,
}

impl EngineConfigContext {
    pub fn new(
        docker_port: u16,
        auth: &AuthOptions,
        engine: &EngineOptions,
        escaping: Escaping,
    ) -> Self {
        let flags = |values: &[String]| -> Vec<String> {
            values.iter().map(|v| escaping.flag_value(v)).collect()
        };
        Self {
            docker_port,
            tls: auth.tls_configured(),
            ca_cert_path: escaping.flag_value(&auth.ca_cert_remote_path),
            server_cert_path: escaping.flag_value(&auth.server_cert_remote_path),
            server_key_path: escaping.flag_value(&auth.server_key_remote_path),
            env: engine.env.iter().map(|e| escaping.env_entry(e)).collect(),
            labels: flags(&engine.labels),
            insecure_registry: flags(&engine.insecure_registry),
            registry_mirror: flags(&engine.registry_mirror),
            storage_driver: escaping.flag_value(&engine.storage_driver),
            arbitrary_flags: flags(&engine.arbitrary_flags),
        }
    }
}

/// Unit formats the provisioners install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitTemplate {
    /// Complete `docker.service` unit.
    Systemd,
    /// Drop-in overriding the `ExecStart=` of an image-provided unit.
    SystemdDropIn,
    /// `DOCKER_OPTS` file read by the upstart job.
    Upstart,
}

impl UnitTemplate {
    pub fn name(self) -> &'static str {
        match self {
            Self::Systemd => "docker.service",
            Self::SystemdDropIn => "docker-dropin.conf",
            Self::Upstart => "docker-upstart",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::Systemd => include_str!("../../templates/docker.service.tera"),
            Self::SystemdDropIn => include_str!("../../templates/docker-dropin.conf.tera"),
            Self::Upstart => include_str!("../../templates/docker-upstart.tera"),
        }
    }

    pub fn escaping(self) -> Escaping {
        match self {
            Self::Systemd | Self::SystemdDropIn => Escaping::Systemd,
            Self::Upstart => Escaping::Shell,
        }
    }

    /// Builds the context for this format from raw options.
    pub fn context(self, docker_port: u16, auth: &AuthOptions, engine: &EngineOptions) -> EngineConfigContext {
        EngineConfigContext::new(docker_port, auth, engine, self.escaping())
    }

    /// Renders the unit text.
    ///
    /// # Errors
    ///
    /// Returns `RsmachineError::Render` if the template fails to parse or render.
    pub fn render(self, context: &EngineConfigContext) -> Result<String, RsmachineError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(self.name(), self.source())?;
        let context = Context::from_serialize(context)?;
        Ok(tera.render(self.name(), &context)?)
    }
}
