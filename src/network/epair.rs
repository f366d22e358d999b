//! epair(4) naming convention
//!
//! Cloning "epair" yields a pair named `epair<N>a` and `epair<N>b`. The kernel
//! only hands back the `a` end, so the `b` end is derived from it.

use crate::error::{Error, Result};

/// Interface cloner name passed to SIOCIFCREATE2
pub const EPAIR_CLONER: &str = "epair";

/// Name of the other end of a freshly created epair
///
/// Relies on the epair(4) convention of swapping the trailing `a` for `b`;
/// nothing in the ioctl interface guarantees it, so an unexpected name is an
/// error rather than a guess.
pub fn peer_name(base: &str) -> Result<String> {
    let unit = base
        .strip_prefix(EPAIR_CLONER)
        .and_then(|rest| rest.strip_suffix('a'))
        .ok_or_else(|| Error::EpairName(base.to_string()))?;

    if unit.is_empty() || !unit.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::EpairName(base.to_string()));
    }

    Ok(format!("{}{}b", EPAIR_CLONER, unit))
}
