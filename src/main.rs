// ABOUTME: Headless tick runner - advances a generated world N ticks and prints a summary
// ABOUTME: No renderer; inspect results through the printed summary or the event log dump

use clap::Parser;

use duneterra::{EngineConfig, GameState};

#[derive(Parser)]
#[command(name = "duneterra")]
#[command(about = "Headless runner for the desert terraforming physics engine")]
struct Args {
    /// Random seed for world generation (defaults to current time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Map width in cells
    #[arg(short = 'W', long, default_value = "64")]
    width: usize,

    /// Map height in cells
    #[arg(short = 'H', long, default_value = "64")]
    height: usize,

    /// Number of ticks to simulate
    #[arg(short, long, default_value = "480")]
    ticks: u64,

    /// Path to a YAML config file; falls back to built-in defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Print the most recent events after the run
    #[arg(long, default_value = "10")]
    events: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });

    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    config.grid_width = args.width;
    config.grid_height = args.height;

    let mut state = GameState::new_state(seed, args.width, args.height, config)
        .map_err(|e| format!("world generation aborted: {e:?}"))?;

    println!("seed {seed}, {}x{} grid, simulating {} ticks", args.width, args.height, args.ticks);

    for _ in 0..args.ticks {
        state.tick();
    }

    println!("tick {}", state.tick);
    println!("total elevation: {}", state.total_elevation());
    println!("average moisture: {:.3}", state.average_moisture());
    println!(
        "water pool: free={} atmospheric={} edge_runoff_total={}",
        state.water.pool.free, state.water.pool.atmospheric, state.water.pool.edge_runoff_total
    );
    println!("structures: {}", state.structures.len());

    if args.events > 0 {
        println!("\nmost recent events:");
        for event in state.recent_events(args.events) {
            println!("  [{:>6}] {:?}: {}", event.tick, event.kind, event.message);
        }
    }

    Ok(())
}
