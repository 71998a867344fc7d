//! Quickstart: compress three clients' gradients and take a majority vote

use ndarray::array;
use signvote_fl::{majority_vote, MomentumSignCompressor, SignCompressor};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("signvote-fl Quickstart Demo\n");

    // One momentum compressor per client, never shared
    let mut clients: Vec<MomentumSignCompressor> = (0..3)
        .map(|_| MomentumSignCompressor::new(0.9).unwrap())
        .collect();

    let gradients = vec![
        vec![array![[0.5, -1.2, 0.0], [2.0, 0.1, -0.3]].into_dyn()],
        vec![array![[0.4, -0.9, 0.2], [-1.0, 0.3, -0.1]].into_dyn()],
        vec![array![[-0.2, -1.1, -0.2], [1.5, -0.2, 0.4]].into_dyn()],
    ];

    let mut updates = Vec::new();
    for (i, (compressor, gradient)) in clients.iter_mut().zip(&gradients).enumerate() {
        let out = compressor.compress(gradient).unwrap();
        println!(
            "client_{}: {} elements, {} baseline bits",
            i, out.cost.element_count, out.cost.bits
        );
        updates.push(out.update);
    }

    let consensus = majority_vote(&updates).unwrap();
    println!("\nConsensus direction:\n{}", consensus.tensors()[0]);

    // Plain signSGD for comparison
    let plain = SignCompressor::new().compress(&gradients[0]).unwrap();
    println!("\nclient_0 plain sign:\n{}", plain.update.tensors()[0]);
}
