use std::sync::Arc;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use spark_tenant_config::{
    ClientOptions, OrganizationalUnit, TenantConfigurationProvider,
    test_stubs::InMemoryConfigurationService,
};

const HOME: &str = "tenant.region.site.team";

fn provider() -> (Arc<InMemoryConfigurationService>, TenantConfigurationProvider) {
    let service = Arc::new(InMemoryConfigurationService::new());
    service.define_value("", "Feature", r#"{"limits":{"burst":[10,20,40]}}"#);
    service.define_value("tenant.region", "Feature", r#"{"limits":{"burst":[5,10,20]}}"#);
    let provider = TenantConfigurationProvider::new(
        ClientOptions::new(OrganizationalUnit::new(HOME), "bench"),
        service.clone(),
        service.clone(),
    )
    .expect("valid options");
    (service, provider)
}

/// Benchmark: 缓存已预热时的树遍历。
///
/// *Why*：命中路径只涉及加锁与逐节点查表，是宿主读取配置的常态；
/// *How*：预先解析一次，使五层祖先链全部进入缓存，再反复读取带子路径的键；
/// *What*：关注单次读取耗时，不包含任何远端访问。
fn bench_warm_lookup(c: &mut Criterion) {
    let (_service, provider) = provider();
    provider.try_get("Feature").expect("warm up");

    c.bench_function("tenant_config_warm_lookup", |b| {
        b.iter(|| {
            let lookup = provider
                .try_get(criterion::black_box("Feature:limits:burst:2"))
                .expect("lookup");
            criterion::black_box(lookup);
        });
    });
}

/// Benchmark: 冷缓存下的首次解析。
///
/// *Why*：衡量批量加载与逐节点抓取在持锁状态下的开销；
/// *How*：每轮迭代构造新的解析器，内存版远端不引入网络延迟；
/// *What*：结果是本地开销的下界。
fn bench_cold_lookup(c: &mut Criterion) {
    c.bench_function("tenant_config_cold_lookup", |b| {
        b.iter_batched(
            provider,
            |(_service, provider)| {
                criterion::black_box(provider.try_get("Feature").expect("lookup"));
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(resolution_benches, bench_warm_lookup, bench_cold_lookup);
criterion_main!(resolution_benches);
