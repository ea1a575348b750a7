//! Size-bounded variant selection

use crate::core::page::Variant;
use tracing::{debug, warn};

/// Largest variant whose size is at or below `limit_bytes`.
///
/// Ties keep the first variant encountered. Variants whose size text cannot be
/// parsed are never selected.
pub fn select_largest_under(variants: &[Variant], limit_bytes: u64) -> Option<&Variant> {
    let mut best: Option<(&Variant, u64)> = None;

    for variant in variants {
        let size = match variant.size_bytes() {
            Ok(size) => size,
            Err(e) => {
                warn!("Ignoring variant '{}': {}", variant.quality, e);
                continue;
            }
        };

        if size > limit_bytes {
            debug!("Variant '{}' ({}) exceeds the ceiling", variant.quality, variant.size_text);
            continue;
        }

        if best.map_or(true, |(_, best_size)| size > best_size) {
            best = Some((variant, size));
        }
    }

    best.map(|(variant, _)| variant)
}
