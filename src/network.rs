//! Interface control for epair(4) and if_bridge(4)
//!
//! Provides:
//! - Validated interface names and link addresses
//! - Native ioctl request layouts, replacing ifconfig commands
//! - The control handle used by both sides of the jail boundary

pub mod control;
pub mod epair;
pub mod ifname;
pub mod ioctl;
pub mod lladdr;

pub use control::{IfCtx, InterfaceControl};
pub use ifname::IfName;
pub use lladdr::LinkAddress;
