//! Synthesis configuration (spec §6 CLI flags / §4.6 SA schedule), loadable
//! from TOML and overridable from the CLI.

use serde::{Deserialize, Serialize};

/// What `synthesize` does when a network cannot be routed (spec §4.7 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnUnroutable {
    Skip,
    Abort,
}

impl Default for OnUnroutable {
    fn default() -> Self {
        OnUnroutable::Abort
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingCube {
    pub size: i32,
}

impl Default for BoundingCube {
    fn default() -> Self {
        BoundingCube { size: 32 }
    }
}

/// Tunables for one `synthesize` run (spec §4.6, §4.7, §6). `Default`
/// mirrors the values used in spec §8's worked scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub seed: u64,
    /// SA initial temperature `T0`.
    pub temperature: f64,
    /// SA exponential cooling factor `alpha`.
    pub alpha: f64,
    pub max_steps: u64,
    pub on_unroutable: OnUnroutable,
    pub bounding_cube: BoundingCube,
    /// Cap on A* explored states per router leg; `None` means unbounded.
    pub max_explored: Option<usize>,
    /// Gate the collision-relaxed routing term in the SA energy (spec §4.6).
    pub use_routing_energy: bool,
    /// Number of independent SA workers run in parallel (spec §5); the
    /// lowest-energy result wins.
    pub placement_workers: usize,
    /// Bound on collision-rejection retries before giving up with
    /// `Infeasible`/neighbor-operator fallback (spec §4.6).
    pub max_placement_retries: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            seed: 0,
            temperature: 10.0,
            alpha: 0.995,
            max_steps: 2000,
            on_unroutable: OnUnroutable::default(),
            bounding_cube: BoundingCube::default(),
            max_explored: Some(20_000),
            use_routing_energy: false,
            placement_workers: 4,
            max_placement_retries: 500,
        }
    }
}

impl SynthesisConfig {
    pub fn from_toml_str(s: &str) -> Result<SynthesisConfig, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let cfg = SynthesisConfig::default();
        let rendered = toml::to_string(&cfg).unwrap();
        let parsed: SynthesisConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg = SynthesisConfig::from_toml_str("seed = 7\n").unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.max_steps, SynthesisConfig::default().max_steps);
    }
}
