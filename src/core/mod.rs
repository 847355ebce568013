// ─── CraftSync Core ───
// Update-check and content-synchronization backend for the launcher.
//
// Architecture:
//   core/
//     config/     — updater configuration (API base, install root)
//     version/    — dotted-version comparison
//     store/      — persisted version record + install marker
//     remote/     — remote authority API (trait + HTTP implementation)
//     checker/    — update decision logic
//     downloader/ — streaming downloads with progress + cancellation
//     content/    — content-pack updater (scope policy, backup, extraction)
//     selfupdate/ — launcher self-replacement
//     updater/    — facade consumed by the shell

pub mod checker;
pub mod config;
pub mod content;
pub mod downloader;
pub mod error;
pub mod http;
pub mod progress;
pub mod remote;
pub mod selfupdate;
pub mod store;
pub mod updater;
pub mod version;

#[cfg(test)]
pub(crate) mod testutil;
