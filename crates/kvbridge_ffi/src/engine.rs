//! Engine installation.
//!
//! The host installs the engine's functions once. Each call copies the
//! table out of the lock before running, so no lock is held while the
//! engine executes.

use crate::error::{result_call, FfiError, FfiResult, KvBridgeResult};
use crate::types::{KvTxn, KvVal};
use kvbridge_core::{Bridge, Config, Dbi, HandleKind, NativeEngine, PutFlags, Status};
use parking_lot::RwLock;
use std::ffi::c_int;
use tracing::info;

/// The engine put: `txn, dbi, key, data[data_count], flags -> status`.
pub type KvPutFn = unsafe extern "C" fn(
    txn: *mut KvTxn,
    dbi: u32,
    key: *const KvVal,
    data: *mut KvVal,
    data_count: usize,
    flags: u32,
) -> c_int;

/// The engine sizing facility, keyed by [`HandleKind`] code.
pub type KvHandleSizeFn = unsafe extern "C" fn(kind: u32) -> usize;

/// The engine's maximum key size.
pub type KvMaxKeySizeFn = unsafe extern "C" fn() -> usize;

/// Function table handed over by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct KvEngineApi {
    /// Required.
    pub put: Option<KvPutFn>,
    /// Required.
    pub handle_size: Option<KvHandleSizeFn>,
    /// Optional; null means the engine imposes no key limit.
    pub max_key_size: Option<KvMaxKeySizeFn>,
}

/// An installed engine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FnEngine {
    put: KvPutFn,
    handle_size: KvHandleSizeFn,
    max_key_size: Option<KvMaxKeySizeFn>,
}

impl FnEngine {
    fn from_api(api: &KvEngineApi) -> FfiResult<Self> {
        Ok(Self {
            put: api.put.ok_or(FfiError::NullPointer("api.put"))?,
            handle_size: api
                .handle_size
                .ok_or(FfiError::NullPointer("api.handle_size"))?,
            max_key_size: api.max_key_size,
        })
    }
}

// The install contract makes every function in the table callable from any
// thread for as long as it stays installed.
impl NativeEngine for FnEngine {
    fn put(
        &self,
        txn: *mut KvTxn,
        dbi: Dbi,
        key: &KvVal,
        data: &mut [KvVal],
        flags: PutFlags,
    ) -> Status {
        let code = unsafe { (self.put)(txn, dbi, key, data.as_mut_ptr(), data.len(), flags.bits()) };
        Status(code)
    }

    fn handle_size(&self, kind: HandleKind) -> usize {
        unsafe { (self.handle_size)(kind.code()) }
    }

    fn max_key_size(&self) -> Option<usize> {
        self.max_key_size.map(|f| unsafe { f() })
    }
}

static ENGINE: RwLock<Option<FnEngine>> = parking_lot::const_rwlock(None);

/// Returns a copy of the installed engine.
pub(crate) fn installed() -> FfiResult<FnEngine> {
    (*ENGINE.read()).ok_or(FfiError::EngineMissing)
}

/// Returns a bridge over the installed engine.
pub(crate) fn bridge() -> FfiResult<Bridge<FnEngine>> {
    Ok(Bridge::new(installed()?, Config::default()))
}

/// Installs the engine's function table, replacing any previous one.
///
/// # Safety
///
/// - `api` must point to a valid table
/// - every function in it must be safe to call from any thread until the
///   table is replaced or uninstalled
#[no_mangle]
pub unsafe extern "C" fn kvbridge_install_engine(api: *const KvEngineApi) -> KvBridgeResult {
    result_call(|| {
        let api = api.as_ref().ok_or(FfiError::NullPointer("api"))?;
        let engine = FnEngine::from_api(api)?;
        *ENGINE.write() = Some(engine);
        info!(
            has_key_limit = engine.max_key_size.is_some(),
            "native engine installed"
        );
        Ok(())
    })
}

/// Removes the installed engine. Calls that need it fail afterwards.
#[no_mangle]
pub extern "C" fn kvbridge_uninstall_engine() {
    if ENGINE.write().take().is_some() {
        info!("native engine uninstalled");
    }
}

/// Returns true if an engine is installed.
#[no_mangle]
pub extern "C" fn kvbridge_engine_installed() -> bool {
    ENGINE.read().is_some()
}
