use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use olivine::error::OlivineError;
use olivine::{input, mesher, post_processor, solver};

/// 2D plane-stress finite element analysis over a triangulated polygon.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the model json
    model: String,

    /// Output csv for per-point displacements
    #[arg(long, default_value = "nodes.csv")]
    nodes_output: String,

    /// Output csv for per-element stresses
    #[arg(long, default_value = "elements.csv")]
    elements_output: String,

    /// Seed for the interior point scatter
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), OlivineError> {
    let mut model = input::load_model(&args.model)?;

    if let Some(scatter) = model.scatter {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        model
            .polygon
            .scatter_points(scatter.count, scatter.min_distance, &mut rng);
    }

    let triangles = mesher::triangulate(&model.polygon)?;
    let points = model.polygon.points();

    let analysis = solver::run(&triangles, &model.material, &points, &model.forces)?;

    post_processor::csv_output(
        &analysis,
        &points,
        &args.nodes_output,
        &args.elements_output,
    )
}
