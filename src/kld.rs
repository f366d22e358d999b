//! Kernel module presence checks
//!
//! jep talks to epair(4) and if_bridge(4) directly, so both drivers have to
//! be in the kernel before the jail side starts creating interfaces.

use crate::error::{Error, Result};
use crate::sys::{self, ModuleStat};
use std::ffi::CString;
use tracing::{debug, info};

/// Drivers required before any interface is created
pub const REQUIRED_MODULES: [&str; 2] = ["if_epair", "if_bridge"];

/// Make sure a kernel module is loaded, loading it if it is not
///
/// A jail without permission to load modules gets an error here rather
/// than a confusing failure from the first ioctl.
pub fn ensure_loaded(module: &str) -> Result<()> {
    if is_loaded(module) {
        debug!(module, "kernel module already present");
        return Ok(());
    }

    let file = CString::new(module)?;
    sys::kldload(&file).map_err(|source| Error::KldLoad {
        module: module.to_string(),
        source,
    })?;

    info!(module, "loaded kernel module");
    Ok(())
}

/// Ensure every module jep depends on
pub fn ensure_required() -> Result<()> {
    REQUIRED_MODULES.iter().try_for_each(|m| ensure_loaded(m))
}

/// Scan all kernel files and the modules they contain
fn is_loaded(module: &str) -> bool {
    let mut fileid = sys::kldnext(0);
    while fileid > 0 {
        let mut modid = sys::kldfirstmod(fileid);
        while modid > 0 {
            let mut stat = ModuleStat::new();
            if sys::modstat(modid, &mut stat).is_ok() && module_matches(&stat.name(), module) {
                return true;
            }
            modid = sys::modfnext(modid);
        }
        fileid = sys::kldnext(fileid);
    }
    false
}

/// Compare a module_stat name with a wanted module, ignoring any bus prefix
/// (e.g. "pci/if_em" matches "if_em")
fn module_matches(stat_name: &str, wanted: &str) -> bool {
    let bare = stat_name
        .split_once('/')
        .map_or(stat_name, |(_, name)| name);
    bare == wanted
}
