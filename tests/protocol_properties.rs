use densecode::protocols::superdense::{
    ChannelState, ConstantDrift, ExecutionPath, Message, ProtocolFacade,
};
use densecode::{ProtocolConfig, RunResult};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn seeded(seed: u64) -> ProtocolFacade {
    ProtocolFacade::from_config(ProtocolConfig::default().with_seed(seed))
        .expect("default config is valid")
        .with_drift(ConstantDrift(1.0))
}

fn statistical(seed: u64) -> ProtocolFacade {
    let config = ProtocolConfig {
        quantum_backend_available: false,
        ..ProtocolConfig::default().with_seed(seed)
    };
    ProtocolFacade::from_config(config)
        .expect("config is valid")
        .with_drift(ConstantDrift(1.0))
}

#[test]
fn noiseless_channel_delivers_the_message() {
    init_tracing();
    let mut facade = seeded(100);
    let results: Vec<RunResult> = (0..50).map(|_| facade.run(1, 0, 0.0).unwrap()).collect();

    let exact = results.iter().filter(|r| r.decoded_matches()).count();
    assert!(exact >= 48, "only {exact}/50 exact");
    let good = results
        .iter()
        .filter(|r| r.success && r.fidelity > 0.9)
        .count();
    assert!(good >= 48, "only {good}/50 high-fidelity successes");
}

#[test]
fn every_distribution_sums_to_the_shot_count() {
    let mut facade = seeded(101);
    for noise in [0.0, 0.05, 0.1, 0.2, 0.3, 0.45, 0.6] {
        for m in Message::ALL {
            let r = facade.run(m.bit0(), m.bit1(), noise).unwrap();
            assert_eq!(r.measurement_counts.total(), 1024, "noise {noise} message {m}");
        }
    }

    let mut fallback = statistical(102);
    for noise in [0.0, 0.3, 0.6] {
        let r = fallback.run(0, 1, noise).unwrap();
        assert_eq!(r.path, ExecutionPath::Statistical);
        assert_eq!(r.measurement_counts.total(), 1024);
    }
}

#[test]
fn configured_shot_count_is_respected() {
    let config = ProtocolConfig {
        shots: 256,
        ..ProtocolConfig::default().with_seed(103)
    };
    let mut facade = ProtocolFacade::from_config(config).unwrap();
    let r = facade.run(1, 1, 0.2).unwrap();
    assert_eq!(r.measurement_counts.total(), 256);
}

#[test]
fn fidelity_and_noise_stay_in_range() {
    let mut facade = seeded(104);
    let mut fallback = statistical(105);
    for i in 0..=12 {
        let noise = i as f64 * 0.05;
        for f in [&mut facade, &mut fallback] {
            let r = f.run(0, 1, noise).unwrap();
            assert!((0.0..=1.0).contains(&r.fidelity), "fidelity {}", r.fidelity);
            assert!((r.error_rate - (1.0 - r.fidelity)).abs() < 1e-12);
            assert!((0.0..=0.6).contains(&r.noise_level));
            assert_eq!(r.requested_noise, noise);
            assert_eq!(r.quantum_advantage, 2.0);
        }
    }
}

#[test]
fn noiseless_balance_is_unbiased() {
    let mut facade = seeded(106);
    let tally = facade.test_balance(20, 0.0).unwrap();

    assert_eq!(tally.len(), 4);
    for label in ["00", "01", "10", "11"] {
        let entry = &tally[label];
        assert_eq!(entry.total_tests, 20);
        assert!(entry.success_rate >= 0.9, "{label}: {}", entry.success_rate);
    }
    let rates: Vec<f64> = tally.values().map(|e| e.success_rate).collect();
    let spread = rates.iter().cloned().fold(f64::MIN, f64::max)
        - rates.iter().cloned().fold(f64::MAX, f64::min);
    assert!(spread <= 0.15);
    assert_eq!(facade.history().len(), 80);
}

#[test]
fn heavy_noise_degrades_the_channel() {
    let mut facade = seeded(107);
    let clean: f64 = (0..30)
        .map(|_| facade.run(0, 0, 0.0).unwrap().fidelity)
        .sum::<f64>()
        / 30.0;
    facade.reset();
    let noisy: f64 = (0..30)
        .map(|_| facade.run(0, 0, 0.6).unwrap().fidelity)
        .sum::<f64>()
        / 30.0;
    assert!(noisy < clean, "noisy {noisy} clean {clean}");
}

#[test]
fn monitor_tracks_channel_health() {
    let mut facade = seeded(108);
    assert_eq!(facade.channel_status().status, ChannelState::Initializing);

    for _ in 0..5 {
        facade.run(1, 1, 0.0).unwrap();
    }
    let status = facade.channel_status();
    assert_eq!(status.status, ChannelState::Excellent);
    assert_eq!(status.quality, "High Performance");
    assert_eq!(status.consecutive_successes, 5);
}

#[test]
fn fallback_results_have_the_same_shape() {
    let mut facade = statistical(109);
    let r = facade.run(1, 0, 0.1).unwrap();
    assert_eq!(r.path, ExecutionPath::Statistical);
    assert_eq!(r.original_bits, Message::from_bits(true, false));
    assert_eq!(r.success, r.decoded_matches());
    assert_eq!(r.protocol_steps.len(), 5);
    assert!(r.crypto.is_none());

    let json = serde_json::to_value(&r).unwrap();
    for key in [
        "original_bits",
        "decoded_bits",
        "fidelity",
        "error_rate",
        "success",
        "noise_level",
        "execution_time",
        "measurement_counts",
        "protocol_steps",
        "timestamp",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["original_bits"], serde_json::json!([1, 0]));
}

#[test]
fn eavesdrop_check_reports_chsh() {
    let mut facade = seeded(110);
    for _ in 0..100 {
        let check = facade.detect_eavesdropping();
        assert!(check.security_metric <= 1.0);
        assert_eq!(check.is_secure, check.chsh_value >= 2.4);
    }
    assert_eq!(facade.security_log().len(), 100);
    facade.reset();
    assert!(facade.security_log().is_empty());
}
