//! FFI layer for embedding the merge engine in other runtimes.
//!
//! All data crosses the boundary as JSON strings. There are no handles:
//! every call is a pure function of its inputs.
//!
//! # Memory Management
//!
//! - Strings returned by `bibmerge_*` functions are allocated by Rust
//! - Caller must free them with `bibmerge_string_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{
    apply::{apply_plan, apply_resolutions, ApplyResult},
    MergeConfig, MergePlan, Merger, Record, Snapshot, ThreeWayConflict,
};
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Snapshot after an application, with what changed.
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Applied {
    snapshot: Snapshot,
    result: ApplyResult,
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `bibmerge_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::new(r#"{"error":"string contained null bytes"}"#)
            .unwrap_or_default()
            .into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

unsafe fn read_snapshot(ptr: *const c_char, name: &str) -> Result<Snapshot, String> {
    let json = from_c_string(ptr).ok_or_else(|| format!("invalid {} JSON", name))?;
    Snapshot::from_json(&json).map_err(|e| format!("{}: {}", name, e))
}

unsafe fn read_json<T: serde::de::DeserializeOwned>(
    ptr: *const c_char,
    name: &str,
) -> Result<T, String> {
    let json = from_c_string(ptr).ok_or_else(|| format!("invalid {} JSON", name))?;
    serde_json::from_str(&json).map_err(|e| format!("{}: parse error: {}", name, e))
}

fn respond<T: serde::Serialize>(result: Result<T, String>) -> *mut c_char {
    let json = match result {
        Ok(value) => FfiResult::ok(value).to_json(),
        Err(message) => FfiResult::<()>::err(message).to_json(),
    };
    to_c_string(json)
}

// ============================================================================
// Merge
// ============================================================================

/// Detect conflicts and compute the automatic merge plan.
///
/// # Arguments
/// - `base_json`, `local_json`, `remote_json`: JSON strings of Snapshot
/// - `config_json`: JSON string of MergeConfig, or null for defaults
///
/// # Returns
/// JSON string: `{"ok": MergeAnalysis}` or `{"error": "message"}`
///
/// # Safety
/// - All pointers must be valid null-terminated C strings or null
/// - Caller must free the returned string with `bibmerge_string_free`
#[no_mangle]
pub unsafe extern "C" fn bibmerge_analyze(
    base_json: *const c_char,
    local_json: *const c_char,
    remote_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    let result = (|| -> Result<_, String> {
        let config = match from_c_string(config_json) {
            Some(json) => MergeConfig::from_json(&json).map_err(|e| e.to_string())?,
            None => MergeConfig::default(),
        };
        let base = read_snapshot(base_json, "base")?;
        let local = read_snapshot(local_json, "local")?;
        let remote = read_snapshot(remote_json, "remote")?;

        Ok(Merger::new(config).analyze(&base, &local, &remote))
    })();
    respond(result)
}

/// Apply a merge plan to a snapshot.
///
/// # Returns
/// JSON string: `{"ok": {"snapshot": Snapshot, "result": ApplyResult}}`
/// or `{"error": "message"}`
///
/// # Safety
/// - All pointers must be valid null-terminated C strings or null
/// - Caller must free the returned string with `bibmerge_string_free`
#[no_mangle]
pub unsafe extern "C" fn bibmerge_apply_plan(
    snapshot_json: *const c_char,
    plan_json: *const c_char,
) -> *mut c_char {
    let result = (|| -> Result<_, String> {
        let mut snapshot = read_snapshot(snapshot_json, "snapshot")?;
        let plan_str = from_c_string(plan_json).ok_or("invalid plan JSON")?;
        let plan = MergePlan::from_json(&plan_str).map_err(|e| e.to_string())?;

        let result = apply_plan(&plan, &mut snapshot);
        Ok(Applied { snapshot, result })
    })();
    respond(result)
}

/// Apply resolved records for a list of conflicts to a snapshot.
///
/// # Arguments
/// - `snapshot_json`: JSON string of Snapshot (usually local)
/// - `conflicts_json`: JSON array of ThreeWayConflict
/// - `resolved_json`: JSON array of Record
///
/// # Returns
/// JSON string: `{"ok": {"snapshot": Snapshot, "result": ApplyResult}}`
/// or `{"error": "message"}`
///
/// # Safety
/// - All pointers must be valid null-terminated C strings or null
/// - Caller must free the returned string with `bibmerge_string_free`
#[no_mangle]
pub unsafe extern "C" fn bibmerge_apply_resolutions(
    snapshot_json: *const c_char,
    conflicts_json: *const c_char,
    resolved_json: *const c_char,
) -> *mut c_char {
    let result = (|| -> Result<_, String> {
        let mut snapshot = read_snapshot(snapshot_json, "snapshot")?;
        let conflicts: Vec<ThreeWayConflict> = read_json(conflicts_json, "conflicts")?;
        let resolved: Vec<Record> = read_json(resolved_json, "resolved")?;

        let result = apply_resolutions(&conflicts, &resolved, &mut snapshot);
        Ok(Applied { snapshot, result })
    })();
    respond(result)
}

// ============================================================================
// Utilities
// ============================================================================

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `bibmerge_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn bibmerge_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn bibmerge_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the snapshot format version.
#[no_mangle]
pub extern "C" fn bibmerge_snapshot_format_version() -> u32 {
    crate::SNAPSHOT_FORMAT_VERSION
}
