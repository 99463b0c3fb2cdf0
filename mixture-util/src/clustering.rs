//! K-means clustering over matrix rows via the `clustering` crate.
//!
//! Used to warm-start mixture-model inference with hard labels.

use log::info;
use nalgebra::DMatrix;

/// Arguments for k-means clustering
#[derive(Debug, Clone)]
pub struct KmeansArgs {
    /// Number of clusters
    pub num_clusters: usize,
    /// Maximum number of iterations
    pub max_iter: usize,
}

impl Default for KmeansArgs {
    fn default() -> Self {
        Self {
            num_clusters: 1,
            max_iter: 100,
        }
    }
}

impl KmeansArgs {
    /// Create args with specified number of clusters
    pub fn with_clusters(num_clusters: usize) -> Self {
        Self {
            num_clusters,
            ..Default::default()
        }
    }
}

/// Cluster the rows of a data matrix (points × dimensions) and return
/// one label per row in `[0, num_clusters)`.
pub fn kmeans_rows(data: &DMatrix<f64>, args: KmeansArgs) -> anyhow::Result<Vec<usize>> {
    let n = data.nrows();
    let k = args.num_clusters;

    if k == 0 {
        anyhow::bail!("number of clusters must be > 0");
    }
    if n == 0 {
        return Ok(vec![]);
    }
    if k <= 1 {
        return Ok(vec![0; n]);
    }

    info!(
        "K-means: {} points x {} dims, k={}, max_iter={}",
        n,
        data.ncols(),
        k,
        args.max_iter
    );

    let rows: Vec<Vec<f64>> = data
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();

    let clust = clustering::kmeans(k, &rows, args.max_iter);
    Ok(clust.membership)
}
