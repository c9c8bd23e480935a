//! Format-conversion decision.
//!
//! | Policy | Animated | Alpha | Convert? |
//! |---|---|---|---|
//! | `none` | any | any | no |
//! | `all` | no | any | yes |
//! | `ie6-safe` | no | no | yes |
//! | `ie6-safe` | no | yes | no |
//! | any | yes | any | no |
//!
//! IE6 paints alpha-transparent PNG pixels as opaque gray, so `ie6-safe`
//! leaves those images in their original format.

use crate::types::ConversionPolicy;

/// Decide whether an image should be retargeted to another file type.
pub fn should_convert(
    policy: ConversionPolicy,
    is_animated: bool,
    has_alpha_transparency: bool,
) -> bool {
    if is_animated {
        return false;
    }
    match policy {
        ConversionPolicy::None => false,
        ConversionPolicy::All => true,
        ConversionPolicy::Ie6Safe => !has_alpha_transparency,
    }
}
