use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{debug, info, warn};
use nalgebra::{Matrix3, Vector3};
use strum::IntoEnumIterator;

use tensorvis::{
    AttributeKind, CancelToken, DeriveConfig, FieldSnapshot,
    NalgebraEigenSolver, TensorField3D, ThreadPool,
    geometry::{Bounds, IndexMapper},
};

/// Tensor field inspection tool
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesizes an analytic tensor field and writes it to disk
    Generate {
        #[clap(flatten)]
        settings: GenerateSettings,
    },

    /// Prints a summary and value ranges for a stored field
    Info {
        /// Input file
        #[clap(short, long)]
        input: PathBuf,

        /// Re-derive eigen-attributes instead of trusting the stored ones
        #[clap(long)]
        rederive: bool,

        /// Number of threads to use when re-deriving
        #[clap(short, long)]
        threads: Option<NonZeroUsize>,

        /// Number of times to re-derive (for benchmarking)
        #[clap(short = 'N', default_value_t = 1)]
        n: usize,
    },

    /// Writes the three tensor columns as raw `f32` vector volumes
    Export {
        /// Input file
        #[clap(short, long)]
        input: PathBuf,

        /// Output prefix; files are named `<prefix>.col{0,1,2}.raw`
        #[clap(short, long)]
        out_prefix: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FieldKind {
    /// Stress-like field around a point load at the grid center
    Stress,
    /// Identity tensor everywhere
    Identity,
    /// Zero tensor everywhere
    Zero,
}

#[derive(Parser)]
struct GenerateSettings {
    /// Name of the file to write
    #[clap(short, long)]
    out: PathBuf,

    /// Number of voxels along each axis
    #[clap(short, long, default_value_t = 16)]
    size: usize,

    /// Field to synthesize
    #[clap(short, long, value_enum, default_value_t = FieldKind::Stress)]
    kind: FieldKind,

    /// Physical bounds, as `xmin xmax ymin ymax zmin zmax`
    #[clap(long, num_args = 6, allow_negative_numbers = true)]
    bounds: Option<Vec<f64>>,

    /// Scale extents so that the longest axis has length 1
    #[clap(long)]
    normalize_extents: bool,
}

////////////////////////////////////////////////////////////////////////////////

fn synthesize(kind: FieldKind, size: usize, n: usize) -> Vec<Matrix3<f32>> {
    match kind {
        FieldKind::Identity => vec![Matrix3::identity(); n],
        FieldKind::Zero => vec![Matrix3::zeros(); n],
        FieldKind::Stress => {
            let center = (size as f32 - 1.0) / 2.0;
            (0..n)
                .map(|i| {
                    let p = Vector3::new(
                        (i % size) as f32,
                        ((i / size) % size) as f32,
                        (i / (size * size)) as f32,
                    ) - Vector3::repeat(center);
                    let r = p.norm();
                    if r < 1e-3 {
                        // Singular at the load itself
                        Matrix3::zeros()
                    } else {
                        let d = p / r;
                        (Matrix3::identity() - d * d.transpose() * 3.0)
                            / (r * r * r)
                    }
                })
                .collect()
        }
    }
}

fn run_generate(settings: &GenerateSettings) -> Result<()> {
    if settings.size == 0 {
        bail!("size must be at least 1");
    }
    let dims = [settings.size; 3];
    let n = IndexMapper::new(dims)
        .with_context(|| format!("size {} is too large", settings.size))?
        .size();
    let start = Instant::now();
    let tensors = synthesize(settings.kind, settings.size, n);
    let mut field = TensorField3D::new(dims, tensors)?;
    info!(
        "built {:?} field ({} voxels) in {:?}",
        settings.kind,
        field.size(),
        start.elapsed()
    );

    if let Some(b) = &settings.bounds {
        let mut arr = [0.0; 6];
        arr.copy_from_slice(b);
        let bounds = Bounds(arr);
        field.set_transform(bounds.to_transform(settings.normalize_extents));
    } else if settings.normalize_extents {
        warn!("--normalize-extents has no effect without --bounds");
    }

    write_field(&settings.out, &field)?;
    info!("wrote {:?}", settings.out);
    Ok(())
}

fn run_info(
    input: &Path,
    rederive: bool,
    threads: Option<NonZeroUsize>,
    n: usize,
) -> Result<()> {
    let mut field = read_field(input)?;

    if rederive {
        let pool: Option<ThreadPool>;
        let threads = match threads {
            Some(t) if t.get() == 1 => None,
            Some(t) => {
                pool = Some(ThreadPool::Custom(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(t.get())
                        .build()?,
                ));
                pool.as_ref()
            }
            None => Some(&ThreadPool::Global),
        };
        let cfg = DeriveConfig {
            threads,
            cancel: CancelToken::new(),
        };

        let mut metadata = field.metadata().as_ref().clone();
        for k in AttributeKind::iter() {
            metadata.drop_column(k.identifier());
        }
        let metadata = Arc::new(metadata);

        let start = Instant::now();
        let mut derived = None;
        for _ in 0..n {
            derived = Some(TensorField3D::with_config(
                field.dimensions(),
                field.tensors().clone(),
                metadata.clone(),
                &NalgebraEigenSolver,
                &cfg,
            )?);
        }
        info!("derived attributes {n} time(s) in {:?}", start.elapsed());

        if let Some(d) = derived {
            if d.metadata() != field.metadata() {
                warn!("re-derived attributes differ from the stored ones");
            }
            field.set_metadata(d.metadata().clone())?;
        }
    }

    field.compute_data_maps()?;
    println!("{field}");
    println!();
    println!("{:<28}{:>14}{:>14}", "Attribute", "min", "max");
    for k in AttributeKind::iter() {
        let r = field.attribute_range(k).data_range;
        println!("{:<28}{:>14.6}{:>14.6}", k.identifier(), r[0], r[1]);
    }
    println!(
        "{:<28}{:>14}",
        "Defined voxels",
        format!("{}/{}", field.num_defined_entries(), field.size())
    );
    Ok(())
}

fn run_export(input: &Path, prefix: &Path) -> Result<()> {
    let field = read_field(input)?;
    for (i, col) in field.column_volumes().iter().enumerate() {
        let mut path = prefix.as_os_str().to_owned();
        path.push(format!(".col{i}.raw"));
        let path = PathBuf::from(path);
        let mut out = BufWriter::new(
            File::create(&path)
                .with_context(|| format!("could not create {path:?}"))?,
        );
        for v in col {
            for c in v.iter() {
                out.write_all(&c.to_le_bytes())?;
            }
        }
        out.flush()?;
        debug!("wrote {} vectors to {path:?}", col.len());
    }
    let [w, h, d] = field.dimensions();
    info!("exported {w} x {h} x {d} column volumes");
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////

fn read_field(path: &Path) -> Result<TensorField3D> {
    let file = File::open(path)
        .with_context(|| format!("could not open {path:?}"))?;
    let snapshot: FieldSnapshot =
        bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("could not decode {path:?}"))?;
    let field = TensorField3D::try_from(snapshot)?;
    debug!("loaded field with dimensions {:?}", field.dimensions());
    Ok(field)
}

fn write_field(path: &Path, field: &TensorField3D) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("could not create {path:?}"))?;
    let mut out = BufWriter::new(file);
    bincode::serialize_into(&mut out, &FieldSnapshot::from(field))?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();

    match args.cmd {
        Command::Generate { settings } => run_generate(&settings),
        Command::Info {
            input,
            rederive,
            threads,
            n,
        } => run_info(&input, rederive, threads, n),
        Command::Export { input, out_prefix } => {
            run_export(&input, &out_prefix)
        }
    }
}
