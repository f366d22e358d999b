//! Scoped teardown of a half-provisioned epair

use crate::network::InterfaceControl;
use tracing::{info, warn};

/// Destroys the tracked interface when dropped, unless disarmed
///
/// The target follows the interface through renames so teardown always
/// addresses the name it currently has.
pub struct Cleanup<'a, C: InterfaceControl> {
    ctx: &'a C,
    target: Option<String>,
}

impl<'a, C: InterfaceControl> Cleanup<'a, C> {
    pub fn new(ctx: &'a C, name: &str) -> Self {
        Self {
            ctx,
            target: Some(name.to_string()),
        }
    }

    #[cfg(test)]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn retarget(&mut self, name: &str) {
        self.target = Some(name.to_string());
    }

    /// Keep the interface
    pub fn disarm(mut self) {
        self.target = None;
    }
}

impl<C: InterfaceControl> Drop for Cleanup<'_, C> {
    fn drop(&mut self) {
        let Some(name) = self.target.take() else {
            return;
        };
        match self.ctx.destroy(&name) {
            Ok(()) => info!(interface = %name, "destroyed interface after failure"),
            Err(e) => warn!(interface = %name, "cleanup failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::fake::FakeKernel;

    #[test]
    fn test_drop_destroys_target() {
        let kernel = FakeKernel::new();
        let ctx = kernel.context(0);
        let base = ctx.create_epair().unwrap();

        drop(Cleanup::new(&ctx, &base));

        assert!(!kernel.exists(0, "epair0a"));
        assert!(!kernel.exists(0, "epair0b"));
    }

    #[test]
    fn test_retarget_follows_rename() {
        let kernel = FakeKernel::new();
        let ctx = kernel.context(0);
        let base = ctx.create_epair().unwrap();

        let mut cleanup = Cleanup::new(&ctx, &base);
        ctx.rename(&base, "jail0").unwrap();
        cleanup.retarget("jail0");
        assert_eq!(cleanup.target(), Some("jail0"));
        drop(cleanup);

        assert!(!kernel.exists(0, "jail0"));
        assert!(!kernel.exists(0, "epair0b"));
    }

    #[test]
    fn test_disarm_keeps_interface() {
        let kernel = FakeKernel::new();
        let ctx = kernel.context(0);
        let base = ctx.create_epair().unwrap();

        Cleanup::new(&ctx, &base).disarm();

        assert!(kernel.exists(0, "epair0a"));
        assert!(kernel.exists(0, "epair0b"));
    }

    #[test]
    fn test_failed_teardown_is_not_fatal() {
        let kernel = FakeKernel::new();
        let ctx = kernel.context(0);
        drop(Cleanup::new(&ctx, "gone0"));
        assert_eq!(kernel.calls(), vec!["destroy gone0"]);
    }
}
