use std::collections::BTreeMap;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use adosim::{BeliefVector, TurnLedger, TurnRecord};

fn wide_vector(n: u32) -> BeliefVector {
    (0..n)
        .map(|i| (format!("H{i}"), f64::from(i % 7 + 1)))
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("belief/normalize");
    for n in [3u32, 64, 1024] {
        let raw = wide_vector(n);
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_function(format!("{n}_hypotheses"), |b| {
            b.iter(|| BeliefVector::normalize(black_box(&raw)));
        });
    }
    group.finish();
}

fn bench_ledger_digest(c: &mut Criterion) {
    let prior = BeliefVector::default_prior();
    let after = BeliefVector::from_pairs([("H1", 0.3), ("H2", 0.4), ("H3", 0.3)]);
    let mut ledger = TurnLedger::new();
    for turn in 1..=3 {
        ledger.record(TurnRecord {
            turn,
            action_id: "patch_db".to_string(),
            action_name: "Patch DB vuln".to_string(),
            cost: 15.0,
            beliefs_before: prior.clone(),
            beliefs_after: after.clone(),
            raw_beliefs_after: after.clone(),
            expected_loss_before: 1000.0,
            expected_loss_after: 600.0,
            roi: 1.5,
            rationale: "Attacker pivots away from the database.".to_string(),
            evidence: BTreeMap::new(),
            recorded_at: Utc::now(),
        });
    }

    c.bench_function("ledger/digest_3_turns", |b| {
        b.iter(|| black_box(&ledger).digest());
    });
}

criterion_group!(benches, bench_normalize, bench_ledger_digest);
criterion_main!(benches);
