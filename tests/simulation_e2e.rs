use ballotcast::{
    ContestComputeConfig, ContestId, Normal, Poll, PollResult, Pollster,
    PollsterName, PresidentialContest, Race, RaceComputeConfig, SimulationConfig, TargetRace,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap()
}

fn poll(contest: Option<&str>, a: f64, b: f64) -> Poll {
    Poll {
        pollster: Pollster::new(PollsterName::NyTimesSiena),
        date: as_of() - Duration::days(1),
        target: TargetRace::President,
        contest: contest.map(ContestId::new),
        result: PollResult {
            party_a: a,
            party_b: b,
        },
    }
}

fn exact() -> ContestComputeConfig {
    ContestComputeConfig {
        quality_uncertainty_factor: 0.0,
        ..ContestComputeConfig::default()
    }
}

fn fixed_config() -> RaceComputeConfig {
    RaceComputeConfig {
        contest_elasticity: 1.0,
        national: ContestComputeConfig::default(),
        contest: exact(),
        ..RaceComputeConfig::default()
    }
}

/// Contests with fixed margins, decided purely by their own polling.
fn fixed_race(contests: &[(&str, u32, f64)]) -> Race {
    let mut race = Race::from_contests(
        contests
            .iter()
            .map(|(id, units, _)| PresidentialContest::new(*id, *units, Normal::zero())),
    );
    race.add_polls([poll(None, 0.49, 0.47), poll(None, 0.47, 0.48)]);
    race.add_polls(
        contests
            .iter()
            .map(|(id, _, margin)| poll(Some(*id), 0.5 + margin / 2.0, 0.5 - margin / 2.0)),
    );
    race
}

fn run(race: &Race, config: &SimulationConfig, seed: u64) -> ballotcast::SimulationOutput {
    let compute = fixed_config();
    let precomputed = race.compute(&compute, as_of()).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    race.simulate(config, &precomputed, &compute, &mut rng).unwrap()
}

fn pollable_race() -> Race {
    let mut race = Race::from_contests([
        PresidentialContest::new("Alpha", 10, Normal::new(0.03, 0.01).unwrap()),
        PresidentialContest::new("Bravo", 8, Normal::new(-0.02, 0.01).unwrap()),
        PresidentialContest::new("Charlie", 6, Normal::new(0.0, 0.02).unwrap()),
        PresidentialContest::new("Delta", 3, Normal::new(0.08, 0.01).unwrap()),
    ]);
    race.add_polls([
        poll(None, 0.48, 0.47),
        poll(None, 0.46, 0.47),
        poll(Some("Alpha"), 0.50, 0.47),
        poll(Some("Charlie"), 0.47, 0.48),
    ]);
    race
}

#[test]
fn fixed_margins_always_elect_party_a_via_the_larger_contest() {
    let race = fixed_race(&[("Big", 3, 0.10), ("Small", 2, -0.10)]);
    let config = SimulationConfig {
        iterations: 3_000,
        ..SimulationConfig::default()
    };
    let out = run(&race, &config, 5);

    assert_eq!(out.win_probabilities.party_a, 1.0);
    assert_eq!(out.win_probabilities.party_b, 0.0);
    assert_eq!(out.tipping_shares.party_a.len(), 1);
    assert_eq!(out.tipping_shares.party_a[&ContestId::new("Big")], 1.0);
    assert_eq!(out.weighted_unit_distribution, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn exact_split_counts_as_tie() {
    let race = fixed_race(&[("East", 2, 0.10), ("West", 2, -0.10)]);
    let config = SimulationConfig {
        iterations: 1_000,
        ..SimulationConfig::default()
    };
    let out = run(&race, &config, 5);

    assert_eq!(out.win_probabilities.tie, 1.0);
    assert!(out.tipping_shares.party_a.is_empty());
    assert!(out.tipping_shares.party_b.is_empty());
    assert_eq!(out.weighted_unit_distribution[2], 1.0);
}

#[test]
fn same_seed_same_output() {
    let race = pollable_race();
    let config = SimulationConfig {
        iterations: 4_000,
        ..SimulationConfig::default()
    };
    let compute = RaceComputeConfig::default();
    let precomputed = race.compute(&compute, as_of()).unwrap();

    let mut first_rng = SmallRng::seed_from_u64(17);
    let mut second_rng = SmallRng::seed_from_u64(17);
    let first = race.simulate(&config, &precomputed, &compute, &mut first_rng).unwrap();
    let second = race.simulate(&config, &precomputed, &compute, &mut second_rng).unwrap();
    assert_eq!(first, second);

    let mut other_rng = SmallRng::seed_from_u64(18);
    let other = race.simulate(&config, &precomputed, &compute, &mut other_rng).unwrap();
    assert_ne!(first.national, other.national);
}

#[test]
fn parallel_and_serial_runs_match() {
    let race = pollable_race();
    let compute = RaceComputeConfig::default();
    let precomputed = race.compute(&compute, as_of()).unwrap();

    // spans several chunks
    let parallel = SimulationConfig {
        iterations: 5_000,
        parallel: true,
        ..SimulationConfig::default()
    };
    let serial = SimulationConfig {
        parallel: false,
        ..parallel
    };

    let mut rng = SmallRng::seed_from_u64(3);
    let a = race.simulate(&parallel, &precomputed, &compute, &mut rng).unwrap();
    let mut rng = SmallRng::seed_from_u64(3);
    let b = race.simulate(&serial, &precomputed, &compute, &mut rng).unwrap();
    assert_eq!(a, b);
}

#[test]
fn zero_iterations_is_rejected() {
    let race = pollable_race();
    let config = SimulationConfig {
        iterations: 0,
        ..SimulationConfig::default()
    };
    let compute = RaceComputeConfig::default();
    let precomputed = race.compute(&compute, as_of()).unwrap();
    let mut rng = SmallRng::seed_from_u64(3);
    let err = race
        .simulate(&config, &precomputed, &compute, &mut rng)
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn deadline_truncates_long_runs() {
    let contests: Vec<PresidentialContest> = (0..40)
        .map(|i| PresidentialContest::new(format!("C{i}"), 1, Normal::new(0.0, 0.02).unwrap()))
        .collect();
    let mut race = Race::from_contests(contests);
    race.add_polls([poll(None, 0.48, 0.47)]);

    let config = SimulationConfig {
        iterations: 2_000_000,
        max_duration_ms: Some(1),
        ..SimulationConfig::default()
    };
    let compute = RaceComputeConfig::default();
    let precomputed = race.compute(&compute, as_of()).unwrap();
    let mut rng = SmallRng::seed_from_u64(8);
    let out = race.simulate(&config, &precomputed, &compute, &mut rng).unwrap();

    assert!(out.truncated);
    assert!(out.iterations_completed > 0);
    assert!(out.iterations_completed < config.iterations);
    let total: f64 = out.weighted_unit_distribution.iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn battlegrounds_pick_the_contest_at_the_threshold() {
    let race = fixed_race(&[("Left", 10, -0.2), ("Middle", 10, 0.0), ("Right", 10, 0.2)]);
    let out = run(
        &race,
        &SimulationConfig {
            iterations: 500,
            ..SimulationConfig::default()
        },
        1,
    );

    for k in 1..=3 {
        let picked = race.battlegrounds(&out, k);
        assert_eq!(picked.len(), k);
        assert!(picked.iter().any(|entry| entry.id.as_str() == "Middle"));
    }
    let top = race.battlegrounds(&out, 1);
    assert_eq!(top[0].id, ContestId::new("Middle"));
    assert!(top[0].mean.abs() < 1e-9);
}

#[test]
fn unit_distribution_matches_contest_probabilities() {
    let race = pollable_race();
    let compute = RaceComputeConfig::default();
    let precomputed = race.compute(&compute, as_of()).unwrap();
    let config = SimulationConfig {
        iterations: 20_000,
        ..SimulationConfig::default()
    };
    let mut rng = SmallRng::seed_from_u64(11);
    let out = race.simulate(&config, &precomputed, &compute, &mut rng).unwrap();

    let expected_closed: f64 = race
        .contests()
        .values()
        .map(|c| {
            let p = precomputed.contest(&c.id).unwrap().probability_a_wins();
            f64::from(c.weight_units) * p
        })
        .sum();
    assert!(
        (out.expected_units_a() - expected_closed).abs() < 0.5,
        "{} vs {expected_closed}",
        out.expected_units_a()
    );
    assert!(out.national.mean().abs() < 0.01);
}
