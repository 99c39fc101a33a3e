//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use kvcache_core::{BackendType, KvCacheConfig, LogLevel, Protocol, GIB, MAX_SIZE};
use proptest::prelude::*;
use serde_yaml::Value;

/// Strategy for generating host names.
pub fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating `host:port` addresses.
pub fn address_strategy() -> impl Strategy<Value = String> {
    (any::<[u8; 4]>(), 1u16..=65535)
        .prop_map(|(ip, port)| format!("{}.{}.{}.{}:{}", ip[0], ip[1], ip[2], ip[3], port))
}

/// Strategy for generating RDMA device names.
pub fn device_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("(lo|eth[0-9]|mlx5_[0-9])").expect("Invalid regex")
}

/// Strategy for generating device names the configuration must reject.
pub fn blank_device_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(" {0,3}").expect("Invalid regex")
}

/// Strategy for generating byte sizes, including the largest one a YAML
/// document can hold.
pub fn size_strategy(max: u64) -> impl Strategy<Value = u64> {
    prop_oneof![9 => 1u64..=max, 1 => Just(MAX_SIZE)]
}

/// Strategy for generating any log level.
pub fn log_level_strategy() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warning),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

/// Strategy for generating any protocol.
pub fn protocol_strategy() -> impl Strategy<Value = Protocol> {
    prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp), Just(Protocol::Ib)]
}

/// Strategy for generating any backend.
pub fn backend_strategy() -> impl Strategy<Value = BackendType> {
    prop_oneof![Just(BackendType::Mooncake), Just(BackendType::Rust)]
}

/// Strategy for generating passthrough entries whose keys never collide
/// with configuration fields.
pub fn extra_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec(
        (
            prop::string::string_regex("x_[a-z]{1,8}").expect("Invalid regex"),
            prop_oneof![
                any::<i64>().prop_map(Value::from),
                any::<bool>().prop_map(Value::from),
                "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
            ],
        ),
        0..4,
    )
}

/// Strategy for generating valid configurations expressible in the legacy
/// flat shape.
pub fn legacy_config_strategy() -> impl Strategy<Value = KvCacheConfig> {
    (
        hostname_strategy(),
        address_strategy(),
        size_strategy(1 << 40),
        size_strategy(1 << 34),
        protocol_strategy(),
        device_name_strategy(),
        prop::option::of(address_strategy()),
        backend_strategy(),
        log_level_strategy(),
        any::<bool>(),
        extra_strategy(),
    )
        .prop_map(
            |(
                host,
                metadata,
                segment,
                buffer,
                protocol,
                device,
                master,
                backend,
                level,
                metrics,
                extra,
            )| {
                build(
                    KvCacheConfig::builder()
                        .local_hostname(host)
                        .metadata_server(metadata)
                        .global_segment_size(segment)
                        .local_buffer_size(buffer)
                        .protocol(protocol)
                        .device_name(device)
                        .master_server_address(master)
                        .backend(backend)
                        .log_level(level)
                        .enable_metrics(metrics),
                    extra,
                )
            },
        )
}

/// Strategy for generating valid configurations expressible in the nested
/// shape: whole-GiB segments and no UDP.
pub fn nested_config_strategy() -> impl Strategy<Value = KvCacheConfig> {
    (
        hostname_strategy(),
        address_strategy(),
        prop_oneof![9 => 1u64..=512, 1 => Just(MAX_SIZE / GIB)],
        size_strategy(1 << 34),
        prop_oneof![Just(Protocol::Tcp), Just(Protocol::Ib)],
        device_name_strategy(),
        prop::option::of(address_strategy()),
        log_level_strategy(),
        extra_strategy(),
    )
        .prop_map(
            |(host, metadata, pool_gib, buffer, protocol, device, master, level, extra)| {
                build(
                    KvCacheConfig::builder()
                        .local_hostname(host)
                        .metadata_server(metadata)
                        .global_segment_size(pool_gib * GIB)
                        .local_buffer_size(buffer)
                        .protocol(protocol)
                        .device_name(device)
                        .master_server_address(master)
                        .log_level(level),
                    extra,
                )
            },
        )
}

fn build(
    mut builder: kvcache_core::KvCacheConfigBuilder,
    extra: Vec<(String, Value)>,
) -> KvCacheConfig {
    for (key, value) in extra {
        builder = builder.extra(key, value);
    }
    builder.build().expect("generated config must be valid")
}

/// Strategy for generating cache keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_/:.-]{1,48}").expect("Invalid regex")
}

/// Strategy for generating values (arbitrary bytes, possibly empty).
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for generating the parts of a multi-part write.
pub fn parts_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..6)
}

/// Strategy for generating sizes the configuration must reject.
pub fn non_positive_size_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0i64), i64::MIN..0]
}

/// Strategy for generating log level names the configuration must reject.
pub fn invalid_log_level_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z]{1,10}")
        .expect("Invalid regex")
        .prop_filter("must not name a real level", |s| s.parse::<LogLevel>().is_err())
}
