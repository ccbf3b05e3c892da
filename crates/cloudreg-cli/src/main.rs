use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use argh::FromArgs;

use cloudreg_icp::{register_point_to_plane, IcpParams};
use cloudreg_io as io;

#[derive(FromArgs)]
/// Align a source .pts scan against a target .pts scan with point-to-plane
/// ICP and write the registered outputs.
struct Args {
    /// path to the source .pts file
    #[argh(positional)]
    source: PathBuf,

    /// path to the target .pts file
    #[argh(positional)]
    target: PathBuf,

    /// directory where aligned outputs are written
    #[argh(option, default = "PathBuf::from(\"output\")")]
    output_dir: PathBuf,

    /// append-only file receiving one-line run summaries
    /// (default: <output-dir>/registration.log)
    #[argh(option)]
    log_file: Option<PathBuf>,

    /// maximum number of ICP iterations
    #[argh(option, default = "50")]
    max_iterations: usize,

    /// maximum number of source points sampled per iteration
    #[argh(option, default = "2000")]
    sample_size: usize,

    /// factor applied to the median residual for outlier rejection
    #[argh(option, default = "0.75")]
    outlier_scale: f64,

    /// convergence tolerance on the relative residual improvement
    #[argh(option, default = "1e-4")]
    tolerance: f64,

    /// fixed seed for reproducible sampling
    #[argh(option)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    // point cloud files are mandatory; transforms have identity fallbacks
    for path in [&args.source, &args.target] {
        if !path.is_file() {
            return Err(format!("missing .pts file: {}", path.display()).into());
        }
    }

    let source = io::read_pts(&args.source)?;
    println!("source cloud: #{} points", source.len());
    let target = io::read_pts(&args.target)?;
    println!("target cloud: #{} points", target.len());

    let m1 = io::read_xf_or_identity(args.source.with_extension("xf"))?;

    // a target transform written by a prior run takes precedence over the
    // sibling .xf so earlier alignment work is not clobbered
    let target_xf = args.target.with_extension("xf");
    let prior_target_xf = output_path(&args.output_dir, &target_xf)?;
    let m2 = if prior_target_xf.is_file() {
        log::info!("using prior transform {}", prior_target_xf.display());
        io::read_xf(&prior_target_xf)?
    } else {
        io::read_xf_or_identity(&target_xf)?
    };

    let params = IcpParams {
        max_iterations: args.max_iterations,
        sample_size: args.sample_size,
        outlier_scale: args.outlier_scale,
        tolerance: args.tolerance,
        seed: args.seed,
    };
    let result = register_point_to_plane(&source, &target, m1, m2, params)?;

    let summary = format!(
        "{} -> {}: {} iterations, mean residual {:.6e}, converged: {}",
        args.source.display(),
        args.target.display(),
        result.num_iterations,
        result.mean_residual,
        result.converged,
    );
    println!("{}", summary);

    let log_file = match args.log_file {
        Some(path) => path,
        None => args.output_dir.join("registration.log"),
    };
    append_summary(&log_file, &summary)?;

    // aligned copies of both inputs plus their transforms and .txt mirrors
    io::write_pts(output_path(&args.output_dir, &args.source)?, &source)?;
    io::write_pts(output_path(&args.output_dir, &args.target)?, &target)?;
    io::write_xf(
        output_path(&args.output_dir, &args.source.with_extension("xf"))?,
        &result.source_transform,
    )?;
    io::write_xf(&prior_target_xf, &m2)?;
    io::write_txt(
        output_path(&args.output_dir, &args.source.with_extension("txt"))?,
        &result.source_transform,
    )?;
    io::write_txt(
        output_path(&args.output_dir, &args.target.with_extension("txt"))?,
        &m2,
    )?;

    Ok(())
}

/// Map an input path to its mirror inside the output directory.
fn output_path(output_dir: &Path, input: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let name = input
        .file_name()
        .ok_or_else(|| format!("invalid file name: {}", input.display()))?;
    Ok(output_dir.join(name))
}

fn append_summary(path: &Path, summary: &str) -> Result<(), std::io::Error> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", summary)
}
