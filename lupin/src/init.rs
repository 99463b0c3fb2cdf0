//! Initial responsibility matrix: random Dirichlet rows or a
//! k-means warm start.

use crate::common::*;
use crate::prior::PriorSpecification;
use mixture_util::clustering::{kmeans_rows, KmeansArgs};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma};

/// How to initialize `lambda_phi`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMethod {
    /// K-means hard labels softened to a high-confidence row (default)
    WarmStart,
    /// Each row drawn from Dirichlet(alpha_o)
    Random,
}

/// Draw each responsibility row from Dirichlet(`alpha_o`).
///
/// rand_distr's Dirichlet is const-generic over the dimension, so a
/// runtime K draws K independent Gamma(alpha_j, 1) variates and
/// normalizes instead.
pub fn random_responsibilities(
    n: usize,
    prior: &PriorSpecification,
    seed: u64,
) -> Result<Mat> {
    let k = prior.num_components();
    let mut rng = SmallRng::seed_from_u64(seed);

    let gammas: Vec<Gamma<f64>> = prior
        .alpha_o
        .iter()
        .map(|&a| Gamma::new(a, 1.0))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| MixtureError::config(format!("invalid Dirichlet concentration: {}", e)))?;

    let mut phi = Mat::zeros(n, k);
    for i in 0..n {
        let mut total = 0.0;
        for (j, g) in gammas.iter().enumerate() {
            let draw = g.sample(&mut rng);
            phi[(i, j)] = draw;
            total += draw;
        }
        for j in 0..k {
            phi[(i, j)] /= total;
        }
    }
    Ok(phi)
}

/// Warm-start responsibilities from k-means labels: the assigned
/// component gets `confidence`, the remaining mass spreads uniformly
/// over the other K-1 components. Soft rows keep the assignment
/// differentiable instead of collapsing to a hard label.
///
/// Falls back to random initialization when there are fewer points
/// than clusters.
pub fn warm_start_responsibilities(
    data: &Mat,
    prior: &PriorSpecification,
    confidence: f64,
    seed: u64,
) -> Result<Mat> {
    let n = data.nrows();
    let k = prior.num_components();

    if k < 2 {
        return Err(MixtureError::config(
            "warm start needs at least 2 components to spread the off-label mass",
        ));
    }
    if !(0.0 < confidence && confidence < 1.0) {
        return Err(MixtureError::config(format!(
            "warm-start confidence must be in (0, 1), got {}",
            confidence
        )));
    }

    if n < k {
        warn!(
            "{} points < {} components; falling back to random initialization",
            n, k
        );
        return random_responsibilities(n, prior, seed);
    }

    let labels = kmeans_rows(data, KmeansArgs::with_clusters(k))
        .map_err(MixtureError::config)?;

    let spread = (1.0 - confidence) / (k as f64 - 1.0);
    let mut phi = Mat::from_element(n, k, spread);
    for (i, &label) in labels.iter().enumerate() {
        phi[(i, label)] = confidence;
    }
    Ok(phi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> Mat {
        Mat::from_row_slice(
            6,
            2,
            &[
                0.0, 0.0, 0.1, 0.1, 0.0, 0.2, //
                9.0, 9.0, 9.1, 9.1, 9.0, 9.2, //
            ],
        )
    }

    #[test]
    fn test_random_rows_stochastic() {
        let prior = PriorSpecification::symmetric(4, 2).unwrap();
        let phi = random_responsibilities(10, &prior, 7).unwrap();

        assert_eq!(phi.nrows(), 10);
        assert_eq!(phi.ncols(), 4);
        for i in 0..10 {
            let s: f64 = phi.row(i).sum();
            assert!((s - 1.0).abs() < 1e-9, "row {} sums to {}", i, s);
            assert!(phi.row(i).iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_random_fixed_seed_deterministic() {
        let prior = PriorSpecification::symmetric(3, 2).unwrap();
        let a = random_responsibilities(8, &prior, 42).unwrap();
        let b = random_responsibilities(8, &prior, 42).unwrap();
        assert_eq!(a, b);

        let c = random_responsibilities(8, &prior, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_warm_start_rows() {
        let prior = PriorSpecification::symmetric(2, 2).unwrap();
        let phi = warm_start_responsibilities(&toy_data(), &prior, 0.9, 1).unwrap();

        for i in 0..6 {
            let s: f64 = phi.row(i).sum();
            assert!((s - 1.0).abs() < 1e-9);
            let max = phi.row(i).iter().cloned().fold(f64::MIN, f64::max);
            assert!((max - 0.9).abs() < 1e-12);
        }

        // the two blobs land on different labels
        assert!((phi[(0, 0)] - phi[(3, 0)]).abs() > 0.5);
    }

    #[test]
    fn test_warm_start_rejects_bad_confidence() {
        let prior = PriorSpecification::symmetric(2, 2).unwrap();
        assert!(warm_start_responsibilities(&toy_data(), &prior, 1.0, 1).is_err());
        assert!(warm_start_responsibilities(&toy_data(), &prior, 0.0, 1).is_err());
    }

    #[test]
    fn test_warm_start_fewer_points_than_components() {
        let prior = PriorSpecification::symmetric(4, 2).unwrap();
        let data = Mat::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        let phi = warm_start_responsibilities(&data, &prior, 0.9, 5).unwrap();

        assert_eq!(phi.nrows(), 2);
        for i in 0..2 {
            assert!((phi.row(i).sum() - 1.0).abs() < 1e-9);
        }
    }
}
