//! Configuration directory discovery.

use std::path::PathBuf;

/// First existing modes directory, in priority order:
/// `./modes`, `$LOGPILOT_MODES`, `<exe_dir>/modes`, `<exe_dir>/../modes`,
/// `$HOME/.logpilot/modes`.
pub fn modes_dir() -> Option<PathBuf> {
    let local = PathBuf::from("modes");
    if local.exists() {
        return Some(local);
    }
    if let Ok(env) = std::env::var("LOGPILOT_MODES") {
        let p = PathBuf::from(env);
        if p.exists() {
            return Some(p);
        }
    }
    if let Some(exe_dir) = exe_dir() {
        let beside = exe_dir.join("modes");
        if beside.exists() {
            return Some(beside);
        }
        let above = exe_dir.join("../modes");
        if above.exists() {
            return Some(above);
        }
    }
    let global = dirs::home_dir()?.join(".logpilot/modes");
    global.exists().then_some(global)
}

/// Fixes directory: `./fixes`, then `$LOGPILOT_FIXES`.
pub fn fixes_dir() -> Option<PathBuf> {
    let local = PathBuf::from("fixes");
    if local.exists() {
        return Some(local);
    }
    if let Ok(env) = std::env::var("LOGPILOT_FIXES") {
        let p = PathBuf::from(env);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

/// Machine-global fixes directory (`$HOME/.logpilot/fixes`), merged into the
/// local set by the loaders.
pub fn global_fixes_dir() -> Option<PathBuf> {
    let global = dirs::home_dir()?.join(".logpilot/fixes");
    global.exists().then_some(global)
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf))
}
