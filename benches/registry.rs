use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqlx_multibind::{BindConfig, BindRegistry, BindSpec};

fn memory_registry(keys: &[&str]) -> BindRegistry {
    let mut config = BindConfig::new();
    for key in keys {
        config.add_bind(*key, BindSpec::from("sqlite::memory:").with_max_connections(1));
    }
    BindRegistry::with_config(config)
}

fn benchmark_registry_lookups(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = memory_registry(&["default"]);

    // Warm both caches so the measurement is the hit path
    rt.block_on(async {
        registry.default_engine().await.unwrap();
        registry.default_session().await.unwrap();
    });

    c.bench_function("get_engine_cached", |b| {
        b.iter(|| {
            rt.block_on(async {
                let engine = registry.get_engine(black_box(None)).await.unwrap();
                black_box(engine);
            })
        })
    });

    c.bench_function("get_session_cached", |b| {
        b.iter(|| {
            rt.block_on(async {
                let session = registry
                    .get_session(black_box(Some("default")))
                    .await
                    .unwrap();
                black_box(session);
            })
        })
    });
}

fn benchmark_session_statements(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = memory_registry(&["default"]);

    let session = rt.block_on(async {
        let session = registry.default_session().await.unwrap();
        session
            .execute("CREATE TABLE bench (id INTEGER PRIMARY KEY, v TEXT)", vec![])
            .await
            .unwrap();
        session.commit().await.unwrap();
        session
    });

    c.bench_function("session_execute_insert", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = session
                    .execute(
                        "INSERT INTO bench (v) VALUES (?)",
                        vec![black_box("row").into()],
                    )
                    .await
                    .unwrap();
                black_box(result);
            })
        })
    });

    rt.block_on(async { session.rollback().await.unwrap() });

    c.bench_function("session_fetch_all_100", |b| {
        rt.block_on(async {
            for i in 0..100 {
                session
                    .execute(
                        "INSERT INTO bench (v) VALUES (?)",
                        vec![format!("row_{}", i).into()],
                    )
                    .await
                    .unwrap();
            }
            session.commit().await.unwrap();
        });

        b.iter(|| {
            rt.block_on(async {
                let rows = session
                    .fetch_all("SELECT id, v FROM bench", vec![])
                    .await
                    .unwrap();
                black_box(rows);
            })
        })
    });

    rt.block_on(async { session.rollback().await.unwrap() });
}

fn benchmark_commit_all(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("commit_all");

    for num_binds in [1, 4, 16].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_binds),
            num_binds,
            |b, &num_binds| {
                let keys: Vec<String> = (0..num_binds)
                    .map(|i| {
                        if i == 0 {
                            "default".to_string()
                        } else {
                            format!("bind_{}", i)
                        }
                    })
                    .collect();
                let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
                let registry = memory_registry(&key_refs);

                rt.block_on(async {
                    for key in &keys {
                        let session = registry.get_session(Some(key.as_str())).await.unwrap();
                        session
                            .execute("CREATE TABLE bench (id INTEGER PRIMARY KEY, v TEXT)", vec![])
                            .await
                            .unwrap();
                        session.commit().await.unwrap();
                    }
                });

                b.iter(|| {
                    rt.block_on(async {
                        for key in &keys {
                            let session =
                                registry.get_session(Some(key.as_str())).await.unwrap();
                            session
                                .execute("INSERT INTO bench (v) VALUES (?)", vec!["x".into()])
                                .await
                                .unwrap();
                        }
                        registry.commit_all().await.unwrap();
                    })
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_registry_lookups,
    benchmark_session_statements,
    benchmark_commit_all
);
criterion_main!(benches);
