use evoclus::config::Config;
use log::info;
use std::env;
use std::process::ExitCode;
use std::time::Instant;

fn init_logging(cfg: &Config) {
    let default_filter = if cfg.engine.suppress_output {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run() -> evoclus::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cfg = evoclus::cli::parse_args(&args)?;
    init_logging(&cfg);

    let start = Instant::now();
    let csr = evoclus::parser::read_metis(&cfg.graph_file)?;
    let graph = csr.into_graph()?;
    if !cfg.engine.suppress_output {
        info!(
            "read {} vertices and {} edges from '{}' in {:.3}s",
            graph.vertex_count(),
            graph.entry_count() / 2,
            cfg.graph_file.display(),
            start.elapsed().as_secs_f64()
        );
    }

    if let Some(path) = &cfg.input_partition {
        let labels = evoclus::parser::read_partition(path)?;
        let modularity = evoclus::engine::evaluate(&graph, &labels)?;
        println!("modularity {}", modularity);
        return Ok(());
    }

    let result = evoclus::engine::cluster_graph(&graph, &cfg.engine)?;
    evoclus::parser::write_partition(&cfg.output_filename, &result.clustering)?;

    println!(
        "modularity {} clusters {} generations {}",
        result.modularity, result.num_clusters, result.generations
    );
    if cfg.print_clustering {
        let labels: Vec<String> = result.clustering.iter().map(|l| l.to_string()).collect();
        println!("clustering {}", labels.join(" "));
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
