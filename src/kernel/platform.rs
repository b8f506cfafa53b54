//! Structural platform preconditions checked before the runtime starts.

use crate::config::types::{PlatformConfig, PreEntryFailure, NATIVE_POINTER_WIDTH_BITS};

/// Verify every configured precondition, in a fixed order: pointer width, then SSE2.
pub fn check_platform(config: &PlatformConfig) -> Result<(), PreEntryFailure> {
    check_pointer_width(config.pointer_width_bits, NATIVE_POINTER_WIDTH_BITS)?;

    if config.require_sse2 {
        check_sse2(sse2_supported())?;
    }

    Ok(())
}

/// The runtime's object layout assumes a pointer width fixed at translation time.
pub fn check_pointer_width(expected_bits: u32, native_bits: u32) -> Result<(), PreEntryFailure> {
    if expected_bits == native_bits {
        return Ok(());
    }

    Err(PreEntryFailure::PlatformIncompatibility(format!(
        "runtime configured for {}-bit pointers but native pointers are {}-bit",
        expected_bits, native_bits
    )))
}

pub fn check_sse2(supported: bool) -> Result<(), PreEntryFailure> {
    if supported {
        Ok(())
    } else {
        Err(PreEntryFailure::PlatformIncompatibility(
            "SSE2 instructions are required but not supported by this CPU".to_string(),
        ))
    }
}

/// Whether the running CPU executes SSE2 instructions.
///
/// Non-x86 targets never need SSE2 and report `true`.
pub fn sse2_supported() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        std::is_x86_feature_detected!("sse2")
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        log::debug!("SSE2 check skipped on non-x86 target");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_pointer_width_passes() {
        assert!(check_pointer_width(64, 64).is_ok());
        assert!(check_pointer_width(32, 32).is_ok());
    }

    #[test]
    fn test_pointer_width_mismatch_message() {
        let err = check_pointer_width(32, 64).unwrap_err();
        assert_eq!(
            err,
            PreEntryFailure::PlatformIncompatibility(
                "runtime configured for 32-bit pointers but native pointers are 64-bit"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_missing_sse2_is_incompatible() {
        assert!(check_sse2(true).is_ok());
        assert!(matches!(
            check_sse2(false),
            Err(PreEntryFailure::PlatformIncompatibility(_))
        ));
    }

    #[test]
    fn test_default_platform_config_passes_on_host() {
        assert!(check_platform(&PlatformConfig::default()).is_ok());
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_x86_64_always_has_sse2() {
        assert!(sse2_supported());
        let config = PlatformConfig {
            require_sse2: true,
            ..PlatformConfig::default()
        };
        assert!(check_platform(&config).is_ok());
    }
}
