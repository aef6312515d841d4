use crate::config::{Config, EngineConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const USAGE: &str = "Usage: evoclus GRAPH_FILE --time_limit=SECS [--seed=N] [--suppress_output] \
[--output_filename=FILE] [--input_partition=FILE] [--threads=N] [--pool_size=N] \
[--max_generations=N] [--cluster_upperbound=N] [--mh_mutate_fraction=F] [--print_clustering]";

const VALUE_FLAGS: &[&str] = &[
    "seed",
    "time_limit",
    "output_filename",
    "input_partition",
    "threads",
    "pool_size",
    "max_generations",
    "cluster_upperbound",
    "mh_mutate_fraction",
];

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| Error::invalid_parameter(name, format!("can't parse '{}'", value)))
}

fn flag_name(known: &str) -> &'static str {
    VALUE_FLAGS
        .iter()
        .copied()
        .find(|&f| f == known)
        .unwrap_or("argument")
}

pub fn parse_args(args: &[String]) -> Result<Config> {
    let mut graph_file: Option<PathBuf> = None;
    let mut output_filename = PathBuf::from("tmpclustering");
    let mut input_partition: Option<PathBuf> = None;
    let mut print_clustering = false;
    let mut time_limit: Option<f64> = None;
    let mut engine = EngineConfig::default();

    let mut i = 0usize;
    while i < args.len() {
        let tok = &args[i];
        i += 1;

        let Some(flag) = tok.strip_prefix("--") else {
            if graph_file.is_none() {
                graph_file = Some(PathBuf::from(tok));
            }
            continue;
        };

        let (name, inline_value) = match flag.split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (flag, None),
        };

        match name {
            "suppress_output" => {
                engine.suppress_output = true;
                continue;
            }
            "print_clustering" => {
                print_clustering = true;
                continue;
            }
            _ if !VALUE_FLAGS.contains(&name) => continue,
            _ => {}
        }

        let value = match inline_value {
            Some(v) => v,
            None => match args.get(i) {
                Some(next) => {
                    i += 1;
                    next.clone()
                }
                None => {
                    return Err(Error::invalid_parameter(
                        flag_name(name),
                        "missing value",
                    ))
                }
            },
        };

        match name {
            "seed" => engine.seed = parse_value("seed", &value)?,
            "time_limit" => time_limit = Some(parse_value("time_limit", &value)?),
            "output_filename" => output_filename = PathBuf::from(value),
            "input_partition" => input_partition = Some(PathBuf::from(value)),
            "threads" => engine.threads = parse_value("threads", &value)?,
            "pool_size" => engine.pool_size = parse_value("pool_size", &value)?,
            "max_generations" => {
                engine.max_generations = Some(parse_value("max_generations", &value)?)
            }
            "cluster_upperbound" => {
                engine.cluster_upperbound = Some(parse_value("cluster_upperbound", &value)?)
            }
            "mh_mutate_fraction" => {
                engine.mutate_fraction = parse_value("mh_mutate_fraction", &value)?
            }
            _ => {}
        }
    }

    let graph_file =
        graph_file.ok_or_else(|| Error::invalid_parameter("graph_file", USAGE.to_string()))?;

    // Evaluating a partition does no clustering, so it needs no budget.
    engine.time_limit = match (time_limit, &input_partition) {
        (Some(t), _) => t,
        (None, Some(_)) => engine.time_limit,
        (None, None) => {
            return Err(Error::invalid_parameter(
                "time_limit",
                format!("is required. {}", USAGE),
            ))
        }
    };
    if input_partition.is_none() {
        engine.validate()?;
    }

    Ok(Config {
        graph_file,
        output_filename,
        input_partition,
        print_clustering,
        engine,
    })
}
