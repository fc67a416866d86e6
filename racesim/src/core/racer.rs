use crate::core::agent::Agent;
use crate::core::controller::AgentController;
use crate::core::lap_tracker::LapTracker;
use crate::interfaces::results_interface::RgbColor;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type RacerId = usize;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RacerKind {
    Human,
    Ai,
}

/// * `name` - Name shown in the results
/// * `color` - Optional CSS color string, e.g. "#FF0000" or "red"
/// * `controller` - Controller parameters overriding single fields of the race defaults (for
/// the human racer this activates the autopilot)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RacerPars {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub controller: Option<Map<String, Value>>,
}

/// Racer bundles everything the race knows about a participant. AI racers always carry a
/// controller, the human racer only if an autopilot is configured.
#[derive(Debug)]
pub struct Racer {
    pub id: RacerId,
    pub name: String,
    pub kind: RacerKind,
    pub color: Option<RgbColor>,
    pub agent: Agent,
    pub laps: LapTracker,
    pub controller: Option<AgentController>,
}

impl Racer {
    pub fn is_human(&self) -> bool {
        self.kind == RacerKind::Human
    }
}

/// parse_color converts a CSS color string into an RGB color. Unparsable colors are reported
/// and dropped since a racer does not need a color to race.
pub fn parse_color(name: &str, color: &str) -> Option<RgbColor> {
    match color.parse::<css_color_parser::Color>() {
        Ok(c) => Some(RgbColor {
            r: c.r,
            g: c.g,
            b: c.b,
        }),
        Err(e) => {
            warn!("Could not parse color {} of racer {}: {}", color, name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_css_colors() {
        assert_eq!(
            parse_color("a", "#FF8000"),
            Some(RgbColor {
                r: 255,
                g: 128,
                b: 0
            })
        );
        assert_eq!(
            parse_color("b", "blue"),
            Some(RgbColor { r: 0, g: 0, b: 255 })
        );
        assert_eq!(parse_color("c", "not a color"), None);
    }
}
