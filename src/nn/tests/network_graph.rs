/*
 * @Description  : 网络构建测试：模块/连接注册、命名、切片与参数量校验
 */

use super::init_logger;
use crate::assert_err;
use crate::errors::{ErrorKind, NetworkError};
use crate::nn::{ConnectionSpec, Init, Module, Network, NetworkConfig, ParamHandle};

#[test]
fn test_register_modules() {
    init_logger();
    let mut net = Network::with_name("net");
    let a = net.add_input_module(Module::linear(2).named("in")).unwrap();
    let h = net.add_module(Module::sigmoid(3)).unwrap();
    let b = net.add_output_module(Module::linear(1).named("out")).unwrap();

    assert_eq!(net.name(), "net");
    assert_eq!(net.modules_count(), 3);
    assert_eq!(net.module_ids(), vec![a, h, b]);
    assert_eq!(net.input_modules(), &[a]);
    assert_eq!(net.output_modules(), &[b]);
    assert_eq!(net.module_by_name("in").unwrap().id(), a);
    // 未命名模块自动生成名称
    assert_eq!(net.module(h).unwrap().name(), "SigmoidLayer_1");
    assert!(net.module_buffers(h).is_some());
}

#[test]
fn test_generated_names_skip_taken() {
    let mut net = Network::new();
    net.add_module(Module::linear(1).named("LinearLayer_1"))
        .unwrap();
    let id = net.add_module(Module::linear(1)).unwrap();
    assert_eq!(net.module(id).unwrap().name(), "LinearLayer_2");
}

#[test]
fn test_duplicate_module_name_rejected() {
    let mut net = Network::with_name("dup");
    net.add_module(Module::linear(1).named("x")).unwrap();
    assert_err!(
        net.add_module(Module::tanh(1).named("x")),
        NetworkError::GraphConstruction(msg) if msg.contains("x")
    );
    assert_eq!(net.modules_count(), 1);
}

#[test]
fn test_same_module_registered_twice_rejected() {
    let mut net = Network::new();
    let module = Module::linear(1);
    net.add_module(module.clone()).unwrap();
    assert_err!(net.add_module(module), NetworkError::GraphConstruction(_));
}

#[test]
fn test_mark_registered_module() {
    let mut net = Network::new();
    let a = net.add_module(Module::linear(2)).unwrap();
    net.sort_modules().unwrap();

    net.mark_input(a).unwrap();
    assert!(!net.is_sorted());
    net.mark_output(a).unwrap();
    // 重复标记无操作
    net.mark_input(a).unwrap();
    net.add_output_module(Module::linear(1)).unwrap();
    assert_eq!(net.input_modules(), &[a]);
    assert_eq!(net.output_modules().len(), 2);
    assert_eq!(net.output_modules()[0], a);

    net.sort_modules().unwrap();
    assert_eq!((net.indim(), net.outdim()), (2, 3));
    let descriptor = net.describe();
    assert!(descriptor.modules[0].is_input && descriptor.modules[0].is_output);

    let stranger = Module::linear(1).id();
    assert_err!(net.mark_input(stranger), NetworkError::GraphConstruction(_));
    assert_err!(net.mark_output(stranger), NetworkError::GraphConstruction(_));
    assert!(net.is_sorted());
}

#[test]
fn test_connect_unregistered_module() {
    let mut net = Network::new();
    let a = net.add_module(Module::linear(2)).unwrap();
    let stranger = Module::linear(2);

    let result = net.add_connection(ConnectionSpec::full(a, stranger.id()));
    assert_err!(result, NetworkError::GraphConstruction(_));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::GraphConstruction);
    assert!(net.connections().is_empty());

    // 属于另一个网络的模块同样视为未注册
    let mut other = Network::new();
    let foreign = other.add_module(Module::linear(2)).unwrap();
    assert_err!(
        net.add_recurrent_connection(ConnectionSpec::identity(foreign, a)),
        NetworkError::GraphConstruction(_)
    );
}

#[test]
fn test_slice_bounds_checked() {
    let mut net = Network::new();
    let a = net.add_module(Module::linear(4)).unwrap();
    let b = net.add_module(Module::linear(2)).unwrap();

    // 越界
    assert_err!(
        net.add_connection(ConnectionSpec::identity(a, b).in_slice(3, 5)),
        NetworkError::GraphConstruction(_)
    );
    // 空切片
    assert_err!(
        net.add_connection(ConnectionSpec::full(a, b).out_slice(1, 1)),
        NetworkError::GraphConstruction(_)
    );
    // 切片后维度不等，恒等连接不成立
    assert_err!(
        net.add_connection(ConnectionSpec::identity(a, b)),
        NetworkError::GraphConstruction(_)
    );

    let id = net
        .add_connection(ConnectionSpec::identity(a, b).in_slice(2, 4))
        .unwrap();
    let connection = net.connection(id).unwrap();
    assert_eq!(connection.in_slice(), 2..4);
    assert_eq!(connection.out_slice(), 0..2);
    assert_eq!((connection.indim(), connection.outdim()), (2, 2));
    assert_eq!(connection.paramdim(), 0);
}

#[test]
fn test_param_count_checked() {
    let mut net = Network::new();
    let a = net.add_module(Module::linear(2)).unwrap();
    let b = net.add_module(Module::linear(3)).unwrap();

    assert_err!(
        net.add_connection(ConnectionSpec::full(a, b).with_params(&[1.0; 5])),
        NetworkError::GraphConstruction(_)
    );
    assert_err!(
        net.add_connection(ConnectionSpec::full(a, b).shared(&ParamHandle::new_shared(4))),
        NetworkError::GraphConstruction(_)
    );

    let id = net
        .add_connection(ConnectionSpec::full(a, b).with_params(&[1.0; 6]))
        .unwrap();
    assert_eq!(net.connection(id).unwrap().paramdim(), 6);
    assert!(!net.connection(id).unwrap().is_shared());
}

#[test]
fn test_connection_names() {
    let mut net = Network::new();
    let a = net.add_module(Module::linear(1)).unwrap();
    let b = net.add_module(Module::linear(1)).unwrap();

    let c1 = net.add_connection(ConnectionSpec::full(a, b)).unwrap();
    let c2 = net
        .add_recurrent_connection(ConnectionSpec::linear(b, b).named("loop"))
        .unwrap();

    assert_eq!(c1.index(), 0);
    assert_eq!(net.connection(c1).unwrap().name(), "FullConnection_1");
    assert_eq!(net.connection(c2).unwrap().name(), "loop");
    assert!(net.connection_by_name("loop").unwrap().is_recurrent());
    assert!(net.has_recurrent_connections());
    assert_eq!(net.recurrent_connections().count(), 1);
}

#[test]
fn test_registration_invalidates_sort() {
    let mut net = Network::new();
    let a = net.add_input_module(Module::linear(1)).unwrap();
    let b = net.add_output_module(Module::linear(1)).unwrap();
    net.add_connection(ConnectionSpec::identity(a, b)).unwrap();
    net.sort_modules().unwrap();
    assert!(net.is_sorted());

    net.add_connection(ConnectionSpec::identity(a, b)).unwrap();
    assert!(!net.is_sorted());
    assert_err!(net.activate(&[1.0]), NetworkError::InvalidState(_));

    net.sort_modules().unwrap();
    net.add_module(Module::linear(1)).unwrap();
    assert!(!net.is_sorted());
}

#[test]
fn test_config_controls_init_and_capacity() {
    let config = NetworkConfig::default()
        .with_name("cfg")
        .with_seed(3)
        .with_initial_capacity(5)
        .with_init(Init::Constant(0.5));
    let mut net = Network::from_config(config.clone());
    assert_eq!(net.config(), &config);

    let a = net.add_module(Module::linear(2)).unwrap();
    let b = net.add_module(Module::linear(2)).unwrap();
    let c = net.add_connection(ConnectionSpec::full(a, b)).unwrap();

    assert_eq!(
        net.connection(c).unwrap().params().unwrap().params().to_vec(),
        vec![0.5; 4]
    );
    // 初始容量向上取 2 的幂
    assert_eq!(net.module_buffers(a).unwrap().capacity(), 8);
}

#[test]
fn test_config_serde() {
    let config = NetworkConfig::default().with_name("json").with_seed(9);
    let json = serde_json::to_string(&config).unwrap();
    let back: NetworkConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);
}

#[test]
fn test_seeded_networks_initialize_identically() {
    let build = || {
        let mut net = Network::new_with_seed(11);
        let a = net.add_module(Module::linear(3)).unwrap();
        let b = net.add_module(Module::linear(2)).unwrap();
        net.add_connection(ConnectionSpec::full(a, b)).unwrap();
        net.params()
    };
    assert_eq!(build(), build());
}
