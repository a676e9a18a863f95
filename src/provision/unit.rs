//! Idempotent unit installation.

use anyhow::Result;
use camino::Utf8Path;
use tracing::{debug, info};

use super::service::InitSystem;
use crate::channel::{CommandChannel, shell_quote, write_file_command};

/// Outcome of [`update_unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitUpdate {
    /// The file was replaced and the service restarted.
    Changed,
    /// The installed file already had this content; nothing was touched.
    Unchanged,
}

/// Installs `content` at `dst` and restarts `name` only if the content changed.
///
/// The content is staged at `<dst>.new` and compared with the active file on
/// the remote side. Any channel failure aborts the update immediately.
pub fn update_unit(
    channel: &dyn CommandChannel,
    init: InitSystem,
    name: &str,
    content: &str,
    dst: &str,
) -> Result<UnitUpdate> {
    info!("updating {} unit: {}", name, dst);

    let staged = format!("{}.new", dst);
    let dir = Utf8Path::new(dst).parent().map_or("/", |p| p.as_str());

    channel.run(&format!(
        "sudo mkdir -p {} && {}",
        shell_quote(dir),
        write_file_command(content, &staged)
    ))?;

    let diff = channel.run(&format!(
        "if sudo cmp -s {dst} {staged}; then sudo rm -f {staged}; echo unchanged; else echo changed; fi",
        dst = shell_quote(dst),
        staged = shell_quote(&staged)
    ))?;
    if diff == "unchanged" {
        debug!("{} is up to date", dst);
        return Ok(UnitUpdate::Unchanged);
    }

    channel.run(&format!("sudo mv -f {} {}", shell_quote(&staged), shell_quote(dst)))?;
    channel.run(&init.apply_command(name))?;
    Ok(UnitUpdate::Changed)
}
