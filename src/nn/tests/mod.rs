mod network_graph;
mod network_sort;

/// 测试中按需打开日志（级别由 RUST_LOG 控制），可重复调用
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
