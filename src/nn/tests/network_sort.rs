/*
 * @Description  : 拓扑排序测试：确定性、幂等、环检测、循环边豁免
 */

use super::init_logger;
use crate::assert_err;
use crate::errors::{ErrorKind, NetworkError};
use crate::nn::{ConnectionSpec, Module, ModuleId, Network};

/// 注册顺序故意与求值顺序不同的菱形：a → {b, c} → d
fn diamond() -> (Network, [ModuleId; 4]) {
    let mut net = Network::with_name("diamond");
    let d = net.add_output_module(Module::linear(1).named("d")).unwrap();
    let c = net.add_module(Module::linear(1).named("c")).unwrap();
    let b = net.add_module(Module::linear(1).named("b")).unwrap();
    let a = net.add_input_module(Module::linear(1).named("a")).unwrap();
    net.add_connection(ConnectionSpec::identity(a, b)).unwrap();
    net.add_connection(ConnectionSpec::identity(a, c)).unwrap();
    net.add_connection(ConnectionSpec::identity(b, d)).unwrap();
    net.add_connection(ConnectionSpec::identity(c, d)).unwrap();
    (net, [a, b, c, d])
}

/// 每条非循环边都从较早的模块指向较晚的模块
fn assert_topological(net: &Network) {
    let order = net.sorted_modules().unwrap();
    let position = |id: ModuleId| order.iter().position(|&m| m == id).unwrap();
    for c in net.connections().iter().filter(|c| !c.is_recurrent()) {
        assert!(
            position(c.from()) < position(c.to()),
            "连接{c}违反求值顺序"
        );
    }
}

#[test]
fn test_sort_diamond() {
    init_logger();
    let (mut net, [a, b, c, d]) = diamond();
    assert!(net.sorted_modules().is_none());

    net.sort_modules().unwrap();
    assert!(net.is_sorted());
    assert_topological(&net);
    // 同层的 b、c 按模块名释放
    assert_eq!(net.sorted_modules().unwrap(), vec![a, b, c, d]);
    assert_eq!(net.indim(), 1);
    assert_eq!(net.outdim(), 1);
}

#[test]
fn test_sort_is_idempotent() {
    let (mut net, _) = diamond();
    net.sort_modules().unwrap();
    let first = net.sorted_modules().unwrap();
    net.sort_modules().unwrap();
    assert_eq!(net.sorted_modules().unwrap(), first);

    // 拓扑变化后重新计算，结果依然确定
    let e = net.add_module(Module::linear(1)).unwrap();
    net.sort_modules().unwrap();
    let second = net.sorted_modules().unwrap();
    let without_e: Vec<ModuleId> = second.iter().copied().filter(|&m| m != e).collect();
    assert_eq!(without_e, first);
    net.sort_modules().unwrap();
    assert_eq!(net.sorted_modules().unwrap(), second);
}

/// 同一个菱形，模块与连接都按相反顺序注册
fn diamond_reversed() -> Network {
    let mut net = Network::with_name("diamond");
    let a = net.add_input_module(Module::linear(1).named("a")).unwrap();
    let b = net.add_module(Module::linear(1).named("b")).unwrap();
    let c = net.add_module(Module::linear(1).named("c")).unwrap();
    let d = net.add_output_module(Module::linear(1).named("d")).unwrap();
    net.add_connection(ConnectionSpec::identity(c, d)).unwrap();
    net.add_connection(ConnectionSpec::identity(b, d)).unwrap();
    net.add_connection(ConnectionSpec::identity(a, c)).unwrap();
    net.add_connection(ConnectionSpec::identity(a, b)).unwrap();
    net
}

fn sorted_names(net: &Network) -> Vec<String> {
    net.sorted_modules()
        .unwrap()
        .into_iter()
        .map(|id| net.module(id).unwrap().name().to_string())
        .collect()
}

#[test]
fn test_same_topology_sorts_identically() {
    let (mut x, _) = diamond();
    let mut y = diamond_reversed();
    x.sort_modules().unwrap();
    y.sort_modules().unwrap();
    assert_eq!(sorted_names(&x), ["a", "b", "c", "d"]);
    assert_eq!(sorted_names(&x), sorted_names(&y));
}

#[test]
fn test_roots_ordered_by_name() {
    let mut net = Network::new();
    let z = net.add_input_module(Module::linear(1).named("z")).unwrap();
    let m = net.add_input_module(Module::linear(1).named("m")).unwrap();
    let out = net.add_output_module(Module::linear(1).named("out")).unwrap();
    net.add_connection(ConnectionSpec::identity(z, out)).unwrap();
    net.add_connection(ConnectionSpec::identity(m, out)).unwrap();
    net.sort_modules().unwrap();
    assert_eq!(sorted_names(&net), ["m", "z", "out"]);
}

#[test]
fn test_chain_sorted_against_registration_order() {
    let mut net = Network::new();
    let ids: Vec<ModuleId> = (0..5)
        .map(|_| net.add_module(Module::linear(1)).unwrap())
        .collect();
    // 4 → 3 → 2 → 1 → 0
    for w in ids.windows(2) {
        net.add_connection(ConnectionSpec::identity(w[1], w[0]))
            .unwrap();
    }
    net.sort_modules().unwrap();
    let expected: Vec<ModuleId> = ids.iter().rev().copied().collect();
    assert_eq!(net.sorted_modules().unwrap(), expected);
}

#[test]
fn test_cycle_detected() {
    init_logger();
    let mut net = Network::with_name("cyclic");
    let a = net.add_input_module(Module::linear(1).named("a")).unwrap();
    let b = net.add_module(Module::linear(1).named("b")).unwrap();
    let c = net.add_output_module(Module::linear(1).named("c")).unwrap();
    net.add_connection(ConnectionSpec::identity(a, b)).unwrap();
    net.add_connection(ConnectionSpec::identity(b, c)).unwrap();
    net.add_connection(ConnectionSpec::identity(c, b)).unwrap();

    let result = net.sort_modules();
    assert_err!(
        result,
        NetworkError::NetworkConstruction(msg) if msg.contains("loop in network graph")
    );
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NetworkConstruction);
    assert!(!net.is_sorted());
    assert_err!(net.activate(&[1.0]), NetworkError::InvalidState(_));
}

#[test]
fn test_self_loop_detected() {
    let mut net = Network::new();
    let a = net.add_module(Module::linear(1).named("a")).unwrap();
    net.add_connection(ConnectionSpec::identity(a, a)).unwrap();
    assert_err!(
        net.sort_modules(),
        NetworkError::NetworkConstruction(msg) if msg.contains("\"a\"")
    );
}

#[test]
fn test_recurrent_edges_exempt_from_cycle_check() {
    let mut net = Network::new();
    let a = net.add_input_module(Module::linear(1)).unwrap();
    let b = net.add_output_module(Module::tanh(1)).unwrap();
    net.add_connection(ConnectionSpec::full(a, b)).unwrap();
    net.add_recurrent_connection(ConnectionSpec::full(b, a)).unwrap();
    net.add_recurrent_connection(ConnectionSpec::full(b, b)).unwrap();

    net.sort_modules().unwrap();
    assert_eq!(net.sorted_modules().unwrap(), vec![a, b]);
}

#[test]
fn test_dims_from_input_and_output_modules() {
    let mut net = Network::new();
    let a = net.add_input_module(Module::linear(2)).unwrap();
    let b = net.add_input_module(Module::linear(3)).unwrap();
    let out = net.add_output_module(Module::linear(4)).unwrap();
    net.add_connection(ConnectionSpec::full(a, out)).unwrap();
    net.add_connection(ConnectionSpec::full(b, out)).unwrap();
    net.sort_modules().unwrap();
    assert_eq!((net.indim(), net.outdim()), (5, 4));

    // 新增输入模块后维度随重新排序更新
    let c = net.add_input_module(Module::linear(1)).unwrap();
    net.add_connection(ConnectionSpec::full(c, out)).unwrap();
    net.sort_modules().unwrap();
    assert_eq!(net.indim(), 6);
    assert_eq!(net.network_buffers().get(crate::nn::BufferKind::Input).dim(), 6);
}
