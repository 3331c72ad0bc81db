//! Tests for event generators

use cep_simulator_core_rs::generator::GeneratorConfig;

#[test]
fn test_uniform_rate_is_exact_over_run() {
    // Uniform generator at rate r over T ticks generates exactly r * T
    let mut generator = GeneratorConfig::Uniform { rate: 10 }.build();
    let total: u64 = (0..1000).map(|t| generator.events_for_tick(t)).sum();
    assert_eq!(total, 10_000);
}

#[test]
fn test_uniform_zero_rate() {
    let mut generator = GeneratorConfig::Uniform { rate: 0 }.build();
    assert_eq!(generator.events_for_tick(0), 0);
}

#[test]
fn test_poisson_deterministic_across_instances() {
    let config = GeneratorConfig::Poisson {
        mean_rate: 12.5,
        seed: 777,
    };
    let mut a = config.build();
    let mut b = config.build();

    let seq_a: Vec<u64> = (0..200).map(|t| a.events_for_tick(t)).collect();
    let seq_b: Vec<u64> = (0..200).map(|t| b.events_for_tick(t)).collect();
    assert_eq!(seq_a, seq_b);
}

#[test]
fn test_poisson_different_seeds_diverge() {
    let mut a = GeneratorConfig::Poisson {
        mean_rate: 12.5,
        seed: 1,
    }
    .build();
    let mut b = GeneratorConfig::Poisson {
        mean_rate: 12.5,
        seed: 2,
    }
    .build();

    let seq_a: Vec<u64> = (0..50).map(|t| a.events_for_tick(t)).collect();
    let seq_b: Vec<u64> = (0..50).map(|t| b.events_for_tick(t)).collect();
    assert_ne!(seq_a, seq_b);
}

#[test]
fn test_poisson_empirical_mean() {
    let mut generator = GeneratorConfig::Poisson {
        mean_rate: 8.0,
        seed: 2024,
    }
    .build();
    let ticks = 20_000u64;
    let total: u64 = (0..ticks).map(|t| generator.events_for_tick(t)).sum();
    let mean = total as f64 / ticks as f64;
    assert!((mean - 8.0).abs() < 0.25, "empirical mean {} off target", mean);
}

#[test]
fn test_trace_replays_and_wraps() {
    let mut generator = GeneratorConfig::Trace {
        counts: vec![5, 0, 3],
    }
    .build();

    let seq: Vec<u64> = (0..8).map(|t| generator.events_for_tick(t)).collect();
    assert_eq!(seq, vec![5, 0, 3, 5, 0, 3, 5, 0]);
}
