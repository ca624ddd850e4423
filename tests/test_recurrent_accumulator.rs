/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 循环累加器 - 用 BPTT 学习输出输入序列的前缀和
 *                 网络结构：Input(1) --w--> Output(1)，Output 上有权值 v 的循环自连接
 *                 yₜ = w·xₜ + v·yₜ₋₁，理想解 w = v = 1
 */
use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, array};
use only_brain::errors::NetworkError;
use only_brain::nn::{ConnectionSpec, Module, Network};

fn get_sequences() -> Vec<Array2<f64>> {
    vec![
        array![[1.0], [0.5], [-1.0]],
        array![[0.2], [0.2], [0.2]],
        array![[-0.5], [1.0], [0.3]],
    ]
}

/// 每个时间步的目标是到该步为止的输入之和
fn prefix_sums(inputs: &Array2<f64>) -> Array2<f64> {
    let mut targets = inputs.clone();
    for t in 1..targets.nrows() {
        targets[[t, 0]] += targets[[t - 1, 0]];
    }
    targets
}

fn build_network() -> Result<Network, NetworkError> {
    let mut net = Network::with_name("accumulator");
    let input = net.add_input_module(Module::linear(1).named("x"))?;
    let output = net.add_output_module(Module::linear(1).named("y"))?;
    net.add_connection(ConnectionSpec::full(input, output).named("w"))?;
    net.add_recurrent_connection(ConnectionSpec::full(output, output).named("v"))?;
    net.sort_modules()?;
    Ok(net)
}

#[test]
fn test_recurrent_accumulator() -> Result<(), NetworkError> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut net = build_network()?;
    // 扁平参数按连接注册顺序：[w, v]
    net.set_parameters(&[0.1, 0.1])?;

    let sequences = get_sequences();
    let learning_rate = 0.05;
    let mut loss = f64::INFINITY;
    for _ in 0..2000 {
        let mut gradient = Array1::<f64>::zeros(net.paramdim());
        loss = 0.0;
        for inputs in &sequences {
            // activate_sequence 会先 reset（包括导数），因此逐序列累加梯度
            let outputs = net.activate_sequence(inputs)?;
            let errors = &outputs - &prefix_sums(inputs);
            loss += 0.5 * errors.iter().map(|e| e * e).sum::<f64>();
            net.back_activate_sequence(&errors)?;
            assert_eq!(net.offset(), 0);
            gradient += &net.derivatives();
        }
        let params = net.params() - learning_rate * &gradient;
        net.set_parameters(&params.to_vec())?;
    }

    assert!(loss < 1e-10, "最终损失过大：{loss}");
    let params = net.params();
    assert_abs_diff_eq!(params[0], 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(params[1], 1.0, epsilon = 1e-4);

    // 学到的网络能对没见过的序列求前缀和
    let unseen = array![[0.7], [-0.2], [0.4], [1.1]];
    let outputs = net.activate_sequence(&unseen)?;
    for (y, target) in outputs.iter().zip(prefix_sums(&unseen).iter()) {
        assert_abs_diff_eq!(*y, *target, epsilon = 1e-3);
    }
    Ok(())
}

#[test]
fn test_connection_lookup_by_name() -> Result<(), NetworkError> {
    let net = build_network()?;
    assert!(net.connection_by_name("v").unwrap().is_recurrent());
    assert!(!net.connection_by_name("w").unwrap().is_recurrent());
    assert_eq!(net.paramdim(), 2);
    Ok(())
}
