//! Runtime and compile-time feature detection.

use crate::Caps;

/// Detect capabilities for the current machine.
///
/// Under Miri this always returns [`Caps::NONE`] so interpreted runs never
/// reach SIMD intrinsics.
#[inline]
pub(crate) fn caps() -> Caps {
  #[cfg(miri)]
  {
    Caps::NONE
  }

  #[cfg(not(miri))]
  {
    #[cfg(feature = "std")]
    {
      static CACHE: std::sync::OnceLock<Caps> = std::sync::OnceLock::new();
      *CACHE.get_or_init(detect_runtime)
    }

    #[cfg(not(feature = "std"))]
    {
      detect_compile_time()
    }
  }
}

#[cfg(all(not(miri), feature = "std"))]
fn detect_runtime() -> Caps {
  #[cfg(target_arch = "x86_64")]
  {
    let mut caps = Caps::NONE;
    if std::arch::is_x86_feature_detected!("sse2") {
      caps |= crate::caps::x86::SSE2;
    }
    caps
  }

  #[cfg(target_arch = "aarch64")]
  {
    let mut caps = Caps::NONE;
    if std::arch::is_aarch64_feature_detected!("neon") {
      caps |= crate::caps::aarch64::NEON;
    }
    caps
  }

  #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
  {
    Caps::NONE
  }
}

/// Compile-time detection: report only features the target guarantees.
#[cfg(any(test, all(not(miri), not(feature = "std"))))]
fn detect_compile_time() -> Caps {
  let mut caps = Caps::NONE;

  #[cfg(target_arch = "x86_64")]
  if cfg!(target_feature = "sse2") {
    caps |= crate::caps::x86::SSE2;
  }

  #[cfg(target_arch = "aarch64")]
  if cfg!(target_feature = "neon") {
    caps |= crate::caps::aarch64::NEON;
  }

  caps
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caps_is_stable_across_calls() {
    assert_eq!(caps(), caps());
  }

  #[test]
  fn runtime_detection_covers_compile_time_features() {
    if cfg!(miri) {
      return;
    }
    // Anything the compiler was allowed to assume must also be detected at
    // runtime.
    assert!(caps().has(detect_compile_time()));
  }

  #[cfg(target_arch = "x86_64")]
  #[test]
  fn x86_64_baseline_has_sse2() {
    if cfg!(miri) {
      assert!(caps().is_empty());
    } else {
      assert!(caps().has(crate::caps::x86::SSE2));
    }
  }
}
