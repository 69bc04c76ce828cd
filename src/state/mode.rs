//! Cardinality mode state machine.
//!
//! # States
//! ```text
//! ServiceMode (fixed at startup):   shaped | firehose
//! high_cardinality (runtime):       off ⇄ on        (toggle only)
//! bomb (runtime):                   off → on        (no way back but restart)
//! ```
//!
//! The bomb flag is raised by rendering the demo page with `?bomb=1`. That a
//! GET can permanently change what every later metric carries is a known quirk
//! of the demo; [`ModeState::activate_bomb`] is the only place it happens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Labeling mode chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Identifiers normalized out of labels.
    Shaped,
    /// Raw per-request identifiers kept on every label set.
    #[default]
    Firehose,
}

impl ServiceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceMode::Shaped => "shaped",
            ServiceMode::Firehose => "firehose",
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shaped" => Ok(ServiceMode::Shaped),
            "firehose" => Ok(ServiceMode::Firehose),
            _ => Err(format!("unknown demo mode '{}', use shaped or firehose", s)),
        }
    }
}

/// Point-in-time copy of the runtime flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CardinalityState {
    pub high_cardinality_enabled: bool,
    pub bomb_enabled: bool,
}

/// Per-service mutable mode flags.
///
/// Flags are atomics so handlers on any runtime worker thread can read and
/// flip them without a lock.
#[derive(Debug)]
pub struct ModeState {
    mode: ServiceMode,
    high_cardinality: AtomicBool,
    bomb: AtomicBool,
}

impl ModeState {
    pub fn new(mode: ServiceMode) -> Self {
        Self {
            mode,
            high_cardinality: AtomicBool::new(false),
            bomb: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    /// Current flags.
    pub fn snapshot(&self) -> CardinalityState {
        CardinalityState {
            high_cardinality_enabled: self.high_cardinality.load(Ordering::SeqCst),
            bomb_enabled: self.bomb.load(Ordering::SeqCst),
        }
    }

    /// Flip the high-cardinality flag and return the new value.
    pub fn toggle_high_cardinality(&self) -> bool {
        let enabled = !self.high_cardinality.fetch_xor(true, Ordering::SeqCst);
        tracing::warn!(
            mode = %self.mode,
            high_cardinality = enabled,
            "High-cardinality labeling toggled"
        );
        enabled
    }

    /// Raise the persistent bomb flag.
    ///
    /// Idempotent. Returns `true` only for the call that actually flipped it.
    pub fn activate_bomb(&self) -> bool {
        let activated = !self.bomb.swap(true, Ordering::SeqCst);
        if activated {
            tracing::warn!(mode = %self.mode, "Cardinality bomb activated until restart");
        }
        activated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = ModeState::new(ServiceMode::Shaped);
        assert_eq!(state.mode(), ServiceMode::Shaped);
        assert_eq!(state.snapshot(), CardinalityState::default());
    }

    #[test]
    fn test_toggle_round_trip() {
        let state = ModeState::new(ServiceMode::Shaped);
        assert!(state.toggle_high_cardinality());
        assert!(state.snapshot().high_cardinality_enabled);
        assert!(!state.toggle_high_cardinality());
        assert_eq!(state.snapshot(), CardinalityState::default());
    }

    #[test]
    fn test_bomb_is_one_way() {
        let state = ModeState::new(ServiceMode::Firehose);
        assert!(state.activate_bomb());
        assert!(!state.activate_bomb());
        assert!(state.snapshot().bomb_enabled);

        // Toggling high cardinality leaves the bomb alone.
        state.toggle_high_cardinality();
        state.toggle_high_cardinality();
        assert!(state.snapshot().bomb_enabled);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("FIREHOSE".parse::<ServiceMode>().unwrap(), ServiceMode::Firehose);
        assert_eq!("shaped".parse::<ServiceMode>().unwrap(), ServiceMode::Shaped);
        assert!("bounded".parse::<ServiceMode>().is_err());
        assert_eq!(ServiceMode::default(), ServiceMode::Firehose);
    }

    #[test]
    fn test_concurrent_toggles_balance_out() {
        let state = std::sync::Arc::new(ModeState::new(ServiceMode::Shaped));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        state.toggle_high_cardinality();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(!state.snapshot().high_cardinality_enabled);
    }
}
