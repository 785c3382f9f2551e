//! Completion engine benchmarks over the in-memory socket simulator.

use std::net::SocketAddr;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sockprobe_core::sim::{SimFaults, SimNetwork};
use sockprobe_core::{
    AddressFamily, Completion, CompletionEngine, EngineOptions, PayloadSpec, Role, TestSpec,
    TransferSession, Transfer,
};

fn echo_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7))
}

fn bench_byte_count(c: &mut Criterion) {
    let targets: &[u64] = &[1024, 16 * 1024, 256 * 1024];
    let mut group = c.benchmark_group("byte_count");
    let payload = PayloadSpec::default();

    for &target in targets {
        group.throughput(Throughput::Bytes(target * 2));
        for chunk in [None, Some(512)] {
            let label = chunk.map_or_else(|| "whole".to_string(), |c| format!("chunk{c}"));
            group.bench_with_input(BenchmarkId::new(label, target), &target, |b, &target| {
                let net = SimNetwork::new();
                net.echo_listener(echo_addr());
                b.iter(|| {
                    let mut api = net.endpoint_with(SimFaults {
                        io_chunk: chunk,
                        ..SimFaults::default()
                    });
                    let Ok(mut session) = TransferSession::open_initiator(&mut api, &echo_addr())
                    else {
                        return;
                    };
                    let transfer = Transfer::Sustained {
                        completion: Completion::Bytes(target),
                        delay: Duration::ZERO,
                    };
                    let outcome = CompletionEngine::new(&mut session, &payload, EngineOptions::default())
                        .run(Role::Initiator, transfer);
                    black_box(outcome.ok());
                });
            });
        }
    }
    group.finish();
}

fn bench_one_shot_run(c: &mut Criterion) {
    let net = SimNetwork::new();
    net.echo_listener(echo_addr());
    let spec = TestSpec::one_shot(Role::Initiator, AddressFamily::V4, "127.0.0.1", 7);
    let payload = PayloadSpec::default();
    let options = sockprobe_core::RunOptions::default();

    c.bench_function("one_shot_run", |b| {
        b.iter(|| {
            let report = sockprobe_core::orchestrator::run(net.endpoint(), &spec, &payload, &options);
            black_box(report.passed());
        });
    });
}

criterion_group!(benches, bench_byte_count, bench_one_shot_run);
criterion_main!(benches);
