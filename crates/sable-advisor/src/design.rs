//! Initial design generation: the fixed sequence of configurations evaluated
//! before any model is trusted.

use rand::RngCore;

use sable_types::{Configuration, SableResult, SearchSpace, SetupError};

use crate::observer::Observer;
use crate::samplers;

/// Number of random candidates fed into farthest-point selection.
const EXPLORE_CANDIDATES: usize = 100;

/// Strategy for the initial design phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    /// Independent random valid configurations.
    Random,
    /// The default configuration plus random ones.
    Default,
    /// Random candidates spread out by farthest-point selection (default).
    RandomExploreFirst,
    /// Latin hypercube sample prefixed by the default configuration.
    LatinHypercube,
    /// Halton sequence prefixed by the default configuration.
    Halton,
}

impl Default for InitStrategy {
    fn default() -> Self {
        Self::RandomExploreFirst
    }
}

impl std::fmt::Display for InitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Random => "random",
            Self::Default => "default",
            Self::RandomExploreFirst => "random_explore_first",
            Self::LatinHypercube => "latin_hypercube",
            Self::Halton => "halton",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for InitStrategy {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "default" => Ok(Self::Default),
            "random_explore_first" => Ok(Self::RandomExploreFirst),
            "latin_hypercube" => Ok(Self::LatinHypercube),
            "halton" => Ok(Self::Halton),
            other => Err(SetupError::UnsupportedOption {
                field: "init_strategy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Create `count` configurations for the initial design phase.
pub fn create_initial_design(
    space: &SearchSpace,
    strategy: InitStrategy,
    count: usize,
    rng: &mut dyn RngCore,
    observer: &dyn Observer,
) -> SableResult<Vec<Configuration>> {
    let default_config = space.default_configuration();
    let num_random = count.saturating_sub(1);

    let configs = match strategy {
        InitStrategy::Random => space.sample_random(count, &[], rng),
        InitStrategy::Default => {
            let mut configs = vec![default_config];
            configs.extend(space.sample_random(num_random, &[], rng));
            configs
        }
        InitStrategy::RandomExploreFirst => {
            let candidates = space.sample_random(EXPLORE_CANDIDATES, &[], rng);
            farthest_point_selection(space, &default_config, &candidates, num_random)?
        }
        InitStrategy::LatinHypercube => {
            decode_prefixed(space, default_config, samplers::latin_hypercube(
                num_random,
                space.len(),
                rng,
            ))?
        }
        InitStrategy::Halton => {
            decode_prefixed(space, default_config, samplers::halton(num_random, space.len()))?
        }
    };

    ensure_valid(space, configs, count, rng, observer)
}

fn decode_prefixed(
    space: &SearchSpace,
    default_config: Configuration,
    points: Vec<Vec<f64>>,
) -> SableResult<Vec<Configuration>> {
    let mut configs = vec![default_config];
    for point in points {
        configs.push(space.from_unit_vector(&point)?);
    }
    Ok(configs)
}

/// Drop invalid configurations and backfill with random valid ones until the
/// target count is reached again, warning about how many were discarded.
pub(crate) fn ensure_valid(
    space: &SearchSpace,
    configs: Vec<Configuration>,
    target: usize,
    rng: &mut dyn RngCore,
    observer: &dyn Observer,
) -> SableResult<Vec<Configuration>> {
    let generated = configs.len();
    let mut valid: Vec<Configuration> = configs
        .into_iter()
        .filter(|c| space.is_valid(c))
        .collect();

    if valid.len() < generated || valid.len() < target {
        observer.warning(&format!(
            "only {}/{} valid configurations generated for the initial design; \
             backfilling with random configurations",
            valid.len(),
            generated
        ));
        let missing = target - valid.len().min(target);
        let backfill = space.sample_random(missing, &valid, rng);
        valid.extend(backfill);
    }
    Ok(valid)
}

/// Farthest-point selection: starting from the seed configuration, repeatedly
/// pick the candidate whose minimum distance (in the unit cube) to all
/// already-selected points is largest, for `num` extra points.
pub fn farthest_point_selection(
    space: &SearchSpace,
    seed: &Configuration,
    candidates: &[Configuration],
    num: usize,
) -> SableResult<Vec<Configuration>> {
    let seed_vector = seed.to_unit_vector(space)?;
    let encoded: Vec<Vec<f64>> = candidates
        .iter()
        .map(|c| c.to_unit_vector(space))
        .collect::<SableResult<_>>()?;

    let mut selected = vec![seed.clone()];
    // Running minimum distance of every candidate to the selected set; only
    // ever decreases as points are added. Consumed candidates drop to -1.
    let mut min_distance: Vec<f64> = encoded
        .iter()
        .map(|vector| distance(vector, &seed_vector))
        .collect();

    for _ in 0..num.min(candidates.len()) {
        let farthest = match min_distance
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        {
            Some((idx, _)) => idx,
            None => break,
        };
        selected.push(candidates[farthest].clone());
        min_distance[farthest] = -1.0;

        for (j, vector) in encoded.iter().enumerate() {
            if min_distance[j] < 0.0 {
                continue;
            }
            min_distance[j] = min_distance[j].min(distance(vector, &encoded[farthest]));
        }
    }
    Ok(selected)
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CapturingObserver;
    use sable_types::ParameterValue;

    fn int_config(x: i64) -> Configuration {
        Configuration::new(vec![ParameterValue::Int(x)])
    }

    #[test]
    fn farthest_point_picks_global_extremes_on_a_line() {
        // Four collinear points 0..3; seed at 0 asking for 2 extra points.
        let space = SearchSpace::new().add_int("x", 0, 3);
        let candidates = vec![int_config(1), int_config(2), int_config(3)];

        let selected =
            farthest_point_selection(&space, &int_config(0), &candidates, 2).unwrap();

        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0], int_config(0));
        // First pick is the far end, never the near neighbours.
        assert_eq!(selected[1], int_config(3));
        // Second pick is whichever interior point remains farthest from
        // {0, 3}; both are equidistant, so either is acceptable.
        assert!(selected[2] == int_config(1) || selected[2] == int_config(2));
    }

    #[test]
    fn farthest_point_updates_running_minimum() {
        // Seed 0, far end at 10, and a decoy at 9 that is far from the seed
        // but close to the far end. The second pick must be the middle point
        // 5, not the greedy-by-seed-distance decoy.
        let space = SearchSpace::new().add_int("x", 0, 10);
        let candidates = vec![int_config(5), int_config(9), int_config(10)];

        let selected =
            farthest_point_selection(&space, &int_config(0), &candidates, 2).unwrap();
        assert_eq!(selected[1], int_config(10));
        assert_eq!(selected[2], int_config(5));
    }

    #[test]
    fn strategies_produce_the_requested_count() {
        let space = SearchSpace::new()
            .add_float("a", 0.0, 1.0)
            .add_int("b", 0, 100);
        let observer = CapturingObserver::new();
        let mut rng = rand::rng();

        for strategy in [
            InitStrategy::Random,
            InitStrategy::Default,
            InitStrategy::RandomExploreFirst,
            InitStrategy::LatinHypercube,
            InitStrategy::Halton,
        ] {
            let configs =
                create_initial_design(&space, strategy, 8, &mut rng, &observer).unwrap();
            assert_eq!(configs.len(), 8, "strategy {strategy}");
            assert!(configs.iter().all(|c| space.is_valid(c)));
        }
        assert!(observer.warnings().is_empty());
    }

    #[test]
    fn default_strategy_leads_with_the_default_configuration() {
        let space = SearchSpace::new().add_float("a", 0.0, 2.0);
        let observer = CapturingObserver::new();
        let mut rng = rand::rng();

        let configs =
            create_initial_design(&space, InitStrategy::Default, 4, &mut rng, &observer)
                .unwrap();
        assert_eq!(configs[0], space.default_configuration());
    }

    #[test]
    fn invalid_configs_are_dropped_and_backfilled_with_warning() {
        let space = SearchSpace::new().add_int("x", 0, 10);
        let observer = CapturingObserver::new();
        let mut rng = rand::rng();

        let configs = vec![int_config(2), int_config(99), int_config(-1)];
        let repaired = ensure_valid(&space, configs, 3, &mut rng, &observer).unwrap();

        assert_eq!(repaired.len(), 3);
        assert!(repaired.iter().all(|c| space.is_valid(c)));
        assert_eq!(observer.warnings().len(), 1);
        assert!(observer.warnings()[0].contains("1/3"));
    }

    #[test]
    fn strategy_parsing_rejects_unknown_names() {
        assert_eq!(
            "random_explore_first".parse::<InitStrategy>().unwrap(),
            InitStrategy::RandomExploreFirst
        );
        let err = "sobol".parse::<InitStrategy>().unwrap_err();
        assert!(err.to_string().contains("sobol"));
    }
}
