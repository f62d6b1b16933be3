use std::fmt;

/// Strategy call shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    BoxForWets,
    BoxForInters,
    ConsiderBox,
    StayOut,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            Recommendation::BoxForWets => "BOX FOR WETS",
            Recommendation::BoxForInters => "BOX FOR INTERS",
            Recommendation::ConsiderBox => "CONSIDER BOX",
            Recommendation::StayOut => "STAY OUT",
        };
        f.write_str(msg)
    }
}

/// recommend returns a simple heuristic strategy call for the current tire age and rain.
/// Rain dominates tire age.
pub fn recommend(tire_age_laps: f64, rain_intensity: f64) -> Recommendation {
    if rain_intensity > 0.5 {
        Recommendation::BoxForWets
    } else if rain_intensity > 0.1 {
        Recommendation::BoxForInters
    } else if tire_age_laps > 20.0 {
        Recommendation::ConsiderBox
    } else {
        Recommendation::StayOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rain_dominates_tire_age() {
        assert_eq!(recommend(30.0, 0.8), Recommendation::BoxForWets);
        assert_eq!(recommend(2.0, 0.3), Recommendation::BoxForInters);
        assert_eq!(recommend(21.0, 0.0), Recommendation::ConsiderBox);
        assert_eq!(recommend(20.0, 0.1), Recommendation::StayOut);
        assert_eq!(Recommendation::BoxForWets.to_string(), "BOX FOR WETS");
    }
}
