use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::mode::Durations;

/// Long break length shared by every preset.
const PRESET_LONG_BREAK_MIN: u32 = 15;

/// Named duration presets offered by the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "preset")]
pub enum Preset {
    Beginner,
    Standard,
    Focus,
    Immersion,
    /// User-picked work and short break; long break stays fixed.
    Custom {
        work_min: u32,
        short_break_min: u32,
    },
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Beginner,
        Preset::Standard,
        Preset::Focus,
        Preset::Immersion,
    ];

    pub fn durations(self) -> Durations {
        match self {
            Preset::Beginner => Durations::new(15, 5, PRESET_LONG_BREAK_MIN),
            Preset::Standard => Durations::new(25, 5, PRESET_LONG_BREAK_MIN),
            Preset::Focus => Durations::new(40, 15, PRESET_LONG_BREAK_MIN),
            Preset::Immersion => Durations::new(60, 15, PRESET_LONG_BREAK_MIN),
            Preset::Custom {
                work_min,
                short_break_min,
            } => Durations::new(work_min, short_break_min, PRESET_LONG_BREAK_MIN),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Beginner => "beginner",
            Preset::Standard => "standard",
            Preset::Focus => "focus",
            Preset::Immersion => "immersion",
            Preset::Custom { .. } => "custom",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Preset::Standard
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.durations();
        write!(
            f,
            "{} ({}/{}/{} min)",
            self.name(),
            d.work_min(),
            d.short_break_min(),
            d.long_break_min()
        )
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| {
                format!("unknown preset '{s}' (expected beginner, standard, focus or immersion)")
            })
    }
}
