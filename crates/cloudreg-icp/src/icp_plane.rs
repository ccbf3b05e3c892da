use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use cloudreg_geometry::linalg::{self, Mat4};
use cloudreg_geometry::Point;
use cloudreg_kdtree::KdTree;

use crate::{ops, IcpError};

/// Parameters of the point-to-plane ICP loop.
#[derive(Debug, Clone)]
pub struct IcpParams {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Upper bound on the number of source points sampled per iteration.
    pub sample_size: usize,
    /// Factor applied to the median residual to form the outlier threshold.
    ///
    /// The default of 0.75 suits clouds with large coordinate values; raise
    /// it (for example to 3.0) for small-scale data.
    pub outlier_scale: f64,
    /// Convergence tolerance on the relative residual improvement.
    pub tolerance: f64,
    /// Optional fixed seed for reproducible sampling.
    pub seed: Option<u64>,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            sample_size: 2000,
            outlier_scale: 0.75,
            tolerance: 1e-4,
            seed: None,
        }
    }
}

/// Outcome of one ICP iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IcpStatus {
    /// The step improved the mean residual; the loop should continue.
    Accepted {
        /// Mean inlier residual after applying the increment.
        mean_residual: f64,
        /// Relative improvement `1 - new_mean / old_mean`.
        improvement: f64,
    },
    /// The step improved the residual and the improvement fell within
    /// tolerance; the loop is done.
    Converged {
        /// Final mean inlier residual.
        mean_residual: f64,
    },
    /// The step did not improve the residual. The increment is discarded
    /// (earlier accepted iterations stand) and the loop terminates.
    Rejected {
        /// Mean inlier residual before the rejected increment.
        mean_residual: f64,
    },
}

/// Result of a completed registration run.
#[derive(Debug, Clone)]
pub struct IcpResult {
    /// Accumulated transform of the source cloud.
    pub source_transform: Mat4,
    /// Number of iterations performed.
    pub num_iterations: usize,
    /// Mean point-to-plane residual over the last sampled inlier set.
    pub mean_residual: f64,
    /// Whether the loop terminated on its own, by the convergence test or by
    /// a rejected step, rather than by hitting the iteration cap.
    pub converged: bool,
}

/// Point-to-plane ICP between two point clouds with per-point normals.
///
/// The engine owns a k-d tree over the target cloud (built once, read-only
/// afterwards) and exposes the loop one iteration at a time: callers that
/// need cancellation or progress reporting drive [`PlaneIcp::step`]
/// themselves, everyone else calls [`PlaneIcp::run`].
#[derive(Debug)]
pub struct PlaneIcp {
    source: Vec<Point>,
    tree: KdTree,
    m1: Mat4,
    m2: Mat4,
    m2_inv: Mat4,
    params: IcpParams,
    indices: Vec<usize>,
    rng: StdRng,
    iterations: usize,
    mean_residual: f64,
}

impl PlaneIcp {
    /// Set up a registration run.
    ///
    /// `source_transform` and `target_transform` are the current transforms
    /// of the two clouds (identity if unknown). The target transform is
    /// never modified; correspondence search happens in the target's local
    /// frame, so the tree is built over the raw target points.
    pub fn new(
        source: &[Point],
        target: &[Point],
        source_transform: Mat4,
        target_transform: Mat4,
        params: IcpParams,
    ) -> Result<Self, IcpError> {
        if source.is_empty() || target.is_empty() {
            return Err(IcpError::EmptyCloud);
        }
        if source.iter().any(|p| !p.has_normal()) || target.iter().any(|p| !p.has_normal()) {
            return Err(IcpError::MissingNormals);
        }
        // an empty sample would leave the median and the solve undefined
        if params.sample_size == 0 {
            return Err(IcpError::ZeroSampleSize);
        }

        let tree = KdTree::from_points(3, target.iter().cloned())?;
        let m2_inv = linalg::inverse44(&target_transform)?;

        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            indices: (0..source.len()).collect(),
            source: source.to_vec(),
            tree,
            m1: source_transform,
            m2: target_transform,
            m2_inv,
            params,
            rng,
            iterations: 0,
            mean_residual: f64::INFINITY,
        })
    }

    /// The accumulated source transform after the iterations so far.
    pub fn source_transform(&self) -> &Mat4 {
        &self.m1
    }

    /// The (unchanged) target transform.
    pub fn target_transform(&self) -> &Mat4 {
        &self.m2
    }

    /// Iterations performed so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Mean inlier residual of the last completed iteration.
    pub fn mean_residual(&self) -> f64 {
        self.mean_residual
    }

    /// Perform one ICP iteration.
    ///
    /// Samples source points, finds their nearest target neighbors, rejects
    /// outliers against the scaled median residual, solves the linearized
    /// pose update and either accepts it into the accumulated transform or
    /// rejects it.
    pub fn step(&mut self) -> Result<IcpStatus, IcpError> {
        let now = std::time::Instant::now();

        // fresh sample of source indices each iteration
        self.indices.shuffle(&mut self.rng);
        let sample_len = self.params.sample_size.min(self.indices.len());

        // map sampled source points into the target's local frame
        let m2inv_m1 = linalg::matmul44(&self.m2_inv, &self.m1);

        let mut correspondences = Vec::with_capacity(sample_len);
        let mut residuals = Vec::with_capacity(sample_len);
        for &i in &self.indices[..sample_len] {
            let mut p = self.source[i].clone();
            p.transform(&m2inv_m1)?;
            let nn = self.tree.nearest(&p)?.ok_or(IcpError::EmptyCloud)?;
            let residual = ops::point_to_plane_residual(&p, nn.point);
            correspondences.push((p, nn.point));
            residuals.push(residual);
        }

        // outlier rejection against the scaled median residual
        let threshold = self.params.outlier_scale * ops::median(&residuals);
        let mut inliers = Vec::with_capacity(correspondences.len());
        let mut residual_sum = 0.0;
        for ((p, q), residual) in correspondences.into_iter().zip(residuals.iter()) {
            if *residual <= threshold {
                inliers.push((p, q));
                residual_sum += residual;
            }
        }
        if inliers.is_empty() {
            return Err(IcpError::NoInliers);
        }
        let old_mean = residual_sum / inliers.len() as f64;

        self.iterations += 1;

        // already exact: nothing left to improve
        if old_mean <= f64::EPSILON {
            self.mean_residual = old_mean;
            return Ok(IcpStatus::Rejected {
                mean_residual: old_mean,
            });
        }

        // linearized pose update from the inlier set
        let (c, d) = ops::accumulate_normal_equations(&inliers);
        let x = ops::solve_increment(&c, &d)?;
        let m_icp = ops::small_angle_transform(&x);

        // re-evaluate the inliers under the increment
        let mut new_sum = 0.0;
        for (p, q) in &inliers {
            let mut moved = p.clone();
            moved.transform(&m_icp)?;
            new_sum += ops::point_to_plane_residual(&moved, q);
        }
        let new_mean = new_sum / inliers.len() as f64;
        let ratio = new_mean / old_mean;

        log::debug!(
            "iteration {}: {} inliers, mean {:.6e} -> {:.6e} ({:?})",
            self.iterations,
            inliers.len(),
            old_mean,
            new_mean,
            now.elapsed()
        );

        if ratio < 1.0 {
            // conjugate the increment out of the target's local frame
            let update = linalg::matmul44(&m_icp, &linalg::matmul44(&self.m2_inv, &self.m1));
            self.m1 = linalg::matmul44(&self.m2, &update);
            self.mean_residual = new_mean;

            if 1.0 - ratio <= self.params.tolerance {
                Ok(IcpStatus::Converged {
                    mean_residual: new_mean,
                })
            } else {
                Ok(IcpStatus::Accepted {
                    mean_residual: new_mean,
                    improvement: 1.0 - ratio,
                })
            }
        } else {
            self.mean_residual = old_mean;
            Ok(IcpStatus::Rejected {
                mean_residual: old_mean,
            })
        }
    }

    /// Drive the loop to termination.
    pub fn run(&mut self) -> Result<IcpResult, IcpError> {
        let mut converged = false;
        while self.iterations < self.params.max_iterations {
            match self.step()? {
                IcpStatus::Accepted { .. } => continue,
                IcpStatus::Converged { .. } | IcpStatus::Rejected { .. } => {
                    converged = true;
                    break;
                }
            }
        }
        Ok(IcpResult {
            source_transform: self.m1,
            num_iterations: self.iterations,
            mean_residual: self.mean_residual,
            converged,
        })
    }
}

/// One-shot point-to-plane registration.
///
/// Builds the engine and drives it to termination; see [`PlaneIcp`] for the
/// resumable form.
pub fn register_point_to_plane(
    source: &[Point],
    target: &[Point],
    source_transform: Mat4,
    target_transform: Mat4,
    params: IcpParams,
) -> Result<IcpResult, IcpError> {
    PlaneIcp::new(source, target, source_transform, target_transform, params)?.run()
}
