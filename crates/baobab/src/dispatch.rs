//! Kernel selection.
//!
//! Selection is purely capability-driven: the preferred kernel for the
//! compilation target runs whenever its required CPU features are present,
//! otherwise the portable kernel does. `platform::caps()` caches detection,
//! so this is a cheap branch after the first call.

use platform::Caps;

use crate::kernels::{Kernel, KernelId, kernel, required_caps};

/// The kernel to use for this process.
#[inline]
#[must_use]
pub(crate) fn active() -> Kernel {
  kernel(resolve(preferred(), platform::caps()))
}

const fn preferred() -> KernelId {
  #[cfg(target_arch = "x86_64")]
  {
    KernelId::X86Sse2
  }
  #[cfg(target_arch = "aarch64")]
  {
    KernelId::Aarch64Neon
  }
  #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
  {
    KernelId::Portable
  }
}

fn resolve(id: KernelId, caps: Caps) -> KernelId {
  if caps.has(required_caps(id)) { id } else { KernelId::Portable }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolve_falls_back_to_portable() {
    assert_eq!(resolve(preferred(), Caps::NONE), KernelId::Portable);
  }

  #[test]
  fn active_kernel_is_supported() {
    let k = active();
    assert!(platform::caps().has(required_caps(k.id)), "active kernel {} unsupported", k.name);
  }
}
