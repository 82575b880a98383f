//! Volume shadow copy scripting for point-in-time capture
//!
//! Builds the PowerShell invocations that create a shadow copy of the
//! volume owning a source path, copy the frozen content out, and delete
//! the shadow again, plus the parsers for the markers those scripts print.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default wall-clock limit for one snapshot acquisition
pub const DEFAULT_SNAPSHOT_TIMEOUT_MINUTES: u64 = 30;

/// One snapshot-and-copy request, immutable once submitted
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

impl SnapshotRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source.into(),
            destination_path: destination.into(),
        }
    }
}

/// Outcome of a successful snapshot-and-copy
#[derive(Debug, Clone)]
pub struct SnapshotResult {
    /// Identifier of the shadow copy that was created (and deleted again)
    pub shadow_id: String,
    /// Combined script output, kept for the companion log and diagnostics
    pub raw_output: String,
    pub exit_code: i32,
}

/// Classified snapshot failures
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot request: {0}")]
    Validation(String),

    #[error("shadow copies are not available: {0}")]
    Unsupported(String),

    #[error("shadow copy creation failed (exit code {exit_code}): {output}")]
    CreationFailed { exit_code: i32, output: String },

    #[error("copy from shadow device failed: {output}")]
    CopyFailed { output: String },

    #[error("snapshot timed out after {minutes} minutes")]
    TimedOut { minutes: u64 },

    #[error("shadow copy process could not be run: {0}")]
    Process(String),
}

/// Split an absolute drive-letter path into its volume root and the
/// volume-relative remainder, e.g. `C:\data\app` into `C:\` and `data\app`.
///
/// Parsed textually so it behaves the same on every build target; `Path`
/// components treat `C:\data` as opaque on non-Windows hosts.
pub fn split_volume(path: &str) -> Result<(String, String), SnapshotError> {
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
            let volume = format!("{}:\\", drive.to_ascii_uppercase());
            let rest = path[2..].trim_start_matches(['\\', '/']).replace('/', "\\");
            Ok((volume, rest))
        }
        _ => Err(SnapshotError::Validation(format!(
            "source path is not rooted in a drive letter: {path}"
        ))),
    }
}

/// Build the script that creates a shadow copy of `volume`, copies
/// `relative` out of the frozen device into `destination`, and deletes the
/// shadow again.
///
/// The shadow id is printed the moment the shadow exists, so a run killed
/// at the time limit still leaves enough output behind to clean up. The
/// `finally` block deletes the shadow on every in-script exit path.
pub fn acquire_script(volume: &str, relative: &str, destination: &Path) -> String {
    let dest = destination.display();
    format!(
        r#"$ErrorActionPreference = 'Stop'
$id = $null
try {{
    $created = (Get-WmiObject -List Win32_ShadowCopy).Create('{volume}', 'ClientAccessible')
    if ($created.ReturnValue -ne 0) {{
        Write-Output "CREATE_RC=$($created.ReturnValue)"
        exit 2
    }}
    $id = $created.ShadowID
    Write-Output "SHADOW_ID=$id"
    $shadow = Get-WmiObject Win32_ShadowCopy | Where-Object {{ $_.ID -eq $id }}
    $shadowPath = $shadow.DeviceObject + '\{relative}'
    Write-Output "SHADOW_PATH=$shadowPath"
    Copy-Item -LiteralPath $shadowPath -Destination '{dest}' -Recurse -Force
    $copied = Get-ChildItem -LiteralPath '{dest}' -Recurse -File | Measure-Object -Property Length -Sum
    Write-Output "COPIED_FILES=$($copied.Count)"
    Write-Output "COPIED_BYTES=$([long]$copied.Sum)"
}} finally {{
    if ($id) {{
        Get-WmiObject Win32_ShadowCopy | Where-Object {{ $_.ID -eq $id }} | ForEach-Object {{ $_.Delete() }}
        Write-Output "CLEANUP=done"
    }}
}}
"#
    )
}

/// Build the script that deletes a shadow copy by id. Used when the
/// acquire script was killed before its own cleanup could run.
pub fn cleanup_script(shadow_id: &str) -> String {
    format!(
        r#"$shadow = Get-WmiObject Win32_ShadowCopy | Where-Object {{ $_.ID -eq '{shadow_id}' }}
if ($shadow) {{ $shadow | ForEach-Object {{ $_.Delete() }}; Write-Output 'CLEANUP=done' }}
else {{ Write-Output 'CLEANUP=missing' }}
"#
    )
}

/// Extract the value of a `NAME=value` marker line from script output
pub fn parse_marker<'a>(output: &'a str, name: &str) -> Option<&'a str> {
    output
        .lines()
        .find_map(|line| {
            line.trim()
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Shadow id printed by the acquire script, if it got that far
pub fn parse_shadow_id(output: &str) -> Option<String> {
    parse_marker(output, "SHADOW_ID").map(str::to_string)
}

/// File and byte counts printed after a completed copy
pub fn parse_copy_stats(output: &str) -> Option<(u64, u64)> {
    let files = parse_marker(output, "COPIED_FILES")?.parse().ok()?;
    let bytes = parse_marker(output, "COPIED_BYTES")?.parse().ok()?;
    Some((files, bytes))
}
