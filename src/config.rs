//! Construction-time configuration (§6 "Configuration", §10.3).

use serde::{Deserialize, Serialize};

/// `A0..A7`-style analog pin aliases, resolved by the builtin layer (§4.8).
/// Defaults match the 8-bit AVR boards (`A0 = 14` .. `A7 = 21`); the source's
/// per-platform variance (§9 Open Questions) is handled by letting the host
/// override this table rather than baking in one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinAliasMap {
    /// Indexed `0..=7` for `A0..=A7`.
    pub analog_pins: [u32; 8],
}

impl Default for PinAliasMap {
    fn default() -> Self {
        PinAliasMap { analog_pins: [14, 15, 16, 17, 18, 19, 20, 21] }
    }
}

impl PinAliasMap {
    /// Resolves `A0..A7` (case-sensitive, as written in source) to a pin number.
    pub fn resolve(&self, alias: &str) -> Option<u32> {
        let idx = alias.strip_prefix('A')?.parse::<usize>().ok()?;
        self.analog_pins.get(idx).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Emit extra `FUNCTION_CALL` records for non-builtin calls.
    pub verbose: bool,
    /// Emit internal state transitions as `log::debug!` lines (§10.1) — not
    /// to be confused with any command-stream record.
    pub debug: bool,
    /// Cap on top-level `loop()` iterations; `0` disables the cap.
    pub max_loop_iterations: u32,
    /// Whether the same cap also applies to `for`/`while`/`do`-`while`.
    pub enforce_loop_limits_on_internal_loops: bool,
    /// Selects Inline (`true`) vs Cooperative (`false`) response delivery.
    pub sync_mode: bool,
    pub pin_aliases: PinAliasMap,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbose: false,
            debug: false,
            max_loop_iterations: 3,
            enforce_loop_limits_on_internal_loops: false,
            sync_mode: true,
            pin_aliases: PinAliasMap::default(),
        }
    }
}
