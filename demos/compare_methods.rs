//! Compare signSGD and Signum under sign-flipping attackers

use ndarray::{Array1, Array2, ArrayD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use signvote_fl::model::{Batch, LogisticRegression};
use signvote_fl::{
    run_round, Client, CommunicationLedger, Compressed, CompressionMethod, GradientCompressor,
    ServerModel, SignFlError, SignSgdConfig, VoteAggregator,
};
use tracing_subscriber::EnvFilter;

/// Uploads the sign of the negated gradient.
struct Flipper(Box<dyn GradientCompressor>);

impl GradientCompressor for Flipper {
    fn compress(&mut self, gradient: &[ArrayD<f32>]) -> Result<Compressed, SignFlError> {
        let flipped: Vec<ArrayD<f32>> = gradient.iter().map(|g| g.mapv(|x| -x)).collect();
        self.0.compress(&flipped)
    }

    fn reset(&mut self) {
        self.0.reset();
    }

    fn name(&self) -> &'static str {
        "flipper"
    }
}

fn batch(rng: &mut StdRng, n: usize) -> Batch {
    let features = Array2::from_shape_fn((n, 4), |_| rng.gen_range(-1.0f32..1.0));
    let truth = [1.0f32, -2.0, 0.5, 0.0];
    let labels = Array1::from_iter(features.rows().into_iter().map(|row| {
        let score: f32 = row.iter().zip(truth.iter()).map(|(x, w)| x * w).sum();
        if score > 0.0 {
            1.0
        } else {
            0.0
        }
    }));
    Batch::new(features, labels).unwrap()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Comparing compression methods\n");
    println!("Scenario: 7 honest clients, 3 sign-flipping clients, 50 rounds\n");

    let methods: Vec<(&str, CompressionMethod)> = vec![
        ("signSGD", CompressionMethod::Sign),
        ("Signum (beta=0.9)", CompressionMethod::MomentumSign { beta: 0.9 }),
    ];

    for (name, method) in methods {
        let config = SignSgdConfig::default()
            .with_method(method)
            .with_step_size(0.02);
        let mut rng = StdRng::seed_from_u64(2024);

        let mut clients: Vec<Client<LogisticRegression>> = (0..10)
            .map(|i| {
                let compressor = config.build_compressor().unwrap();
                let compressor: Box<dyn GradientCompressor> = if i < 7 {
                    compressor
                } else {
                    Box::new(Flipper(compressor))
                };
                Client::new(
                    format!("client_{}", i),
                    LogisticRegression::new(4),
                    compressor,
                    batch(&mut rng, 50),
                )
            })
            .collect();

        let mut server = ServerModel::from_config(LogisticRegression::new(4), &config).unwrap();
        let mut agg = VoteAggregator::new();
        let mut ledger = CommunicationLedger::new();
        let eval = batch(&mut rng, 500);

        for round in 0..50 {
            run_round(&mut server, &mut clients, &mut agg, &mut ledger, round).unwrap();
        }

        let metrics = server.evaluate(&eval).unwrap();
        let total = ledger.total();
        println!(
            "{:<20} loss {:.4}  accuracy {:.3}  sent {} elements ({} baseline bits)",
            name, metrics.loss, metrics.accuracy, total.element_count, total.bits
        );
        println!(
            "{:<20} agreement honest {:.2}  flipper {:.2}",
            "",
            agg.agreement("client_0"),
            agg.agreement("client_9")
        );
    }
}
