use crate::csr::CsrArrays;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .map_err(|e| io_error(path, e))
}

struct Header {
    vertices: usize,
    edges: usize,
    vertex_weights: bool,
    edge_weights: bool,
}

fn parse_header(path: &Path, line_no: usize, line: &str) -> Result<Header> {
    let mut parts = line.split_whitespace();
    let mut number = |what: &str| -> Result<usize> {
        parts
            .next()
            .ok_or_else(|| parse_error(path, line_no, format!("missing {} in header", what)))?
            .parse::<usize>()
            .map_err(|_| parse_error(path, line_no, format!("can't parse {} in header", what)))
    };
    let vertices = number("vertex count")?;
    let edges = number("edge count")?;
    let fmt = parts.next().unwrap_or("0");
    let (vertex_weights, edge_weights) = match fmt {
        "0" | "00" | "000" => (false, false),
        "1" | "01" | "001" => (false, true),
        "10" | "010" => (true, false),
        "11" | "011" => (true, true),
        other => {
            return Err(parse_error(
                path,
                line_no,
                format!("unsupported format code '{}'", other),
            ))
        }
    };
    if let Some(ncon) = parts.next() {
        if ncon != "1" {
            return Err(parse_error(
                path,
                line_no,
                "multi-constraint vertex weights are not supported",
            ));
        }
    }
    Ok(Header {
        vertices,
        edges,
        vertex_weights,
        edge_weights,
    })
}

/// Reads a METIS adjacency file: a header `n m [fmt]` followed by one line
/// per vertex listing `[vertex weight] (neighbor [edge weight])*` with
/// 1-indexed neighbors. Lines starting with `%` are comments.
pub fn read_metis(path: &Path) -> Result<CsrArrays> {
    let lines = read_lines(path)?;
    let mut numbered = lines
        .iter()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.starts_with('%'));

    let (header_no, header) = loop {
        match numbered.next() {
            Some((_, l)) if l.is_empty() => continue,
            Some((no, l)) => break (no, parse_header(path, no, l)?),
            None => return Err(parse_error(path, lines.len(), "missing header line")),
        }
    };

    let n = header.vertices;
    let vertex_lines = lines.len() - header_no;
    if n > vertex_lines {
        return Err(parse_error(
            path,
            header_no,
            format!("header declares {} vertices but only {} lines follow", n, vertex_lines),
        ));
    }
    let entries = header.edges.checked_mul(2).ok_or_else(|| {
        parse_error(
            path,
            header_no,
            format!("edge count {} is too large", header.edges),
        )
    })?;
    // Every list entry takes at least two bytes of input.
    let input_bytes: usize = lines.iter().map(|l| l.len() + 1).sum();
    let reserve = entries.min(input_bytes / 2);
    let mut csr = CsrArrays {
        vertex_weights: Vec::with_capacity(n),
        offsets: Vec::with_capacity(n + 1),
        neighbors: Vec::with_capacity(reserve),
        edge_weights: Vec::with_capacity(reserve),
    };
    csr.offsets.push(0);

    for v in 0..n {
        let (no, line) = numbered.next().ok_or_else(|| {
            parse_error(
                path,
                lines.len(),
                format!("expected {} vertex lines, found {}", n, v),
            )
        })?;
        let mut tokens = line.split_whitespace();

        let weight = if header.vertex_weights {
            let tok = tokens
                .next()
                .ok_or_else(|| parse_error(path, no, "missing vertex weight"))?;
            let w = tok
                .parse::<u64>()
                .map_err(|_| parse_error(path, no, format!("can't parse vertex weight '{}'", tok)))?;
            if w == 0 {
                return Err(parse_error(path, no, "vertex weight must be positive"));
            }
            w
        } else {
            1
        };
        csr.vertex_weights.push(weight);

        while let Some(tok) = tokens.next() {
            let nb = tok
                .parse::<usize>()
                .map_err(|_| parse_error(path, no, format!("can't parse neighbor '{}'", tok)))?;
            if nb == 0 || nb > n {
                return Err(parse_error(
                    path,
                    no,
                    format!("neighbor {} outside 1..={}", nb, n),
                ));
            }
            let w = if header.edge_weights {
                let wt = tokens
                    .next()
                    .ok_or_else(|| parse_error(path, no, format!("missing weight for neighbor {}", nb)))?;
                wt.parse::<f64>()
                    .map_err(|_| parse_error(path, no, format!("can't parse edge weight '{}'", wt)))?
            } else {
                1.0
            };
            csr.neighbors.push((nb - 1) as u32);
            csr.edge_weights.push(w);
        }
        csr.offsets.push(csr.neighbors.len());
    }

    if let Some((no, extra)) = numbered.find(|(_, l)| !l.is_empty()) {
        return Err(parse_error(
            path,
            no,
            format!("unexpected data after {} vertex lines: '{}'", n, extra),
        ));
    }

    if csr.neighbors.len() != entries {
        return Err(parse_error(
            path,
            header_no,
            format!(
                "header declares {} edges but the lists hold {} entries",
                header.edges,
                csr.neighbors.len()
            ),
        ));
    }
    Ok(csr)
}

/// Reads one cluster label per line; blank and `%` lines are skipped.
pub fn read_partition(path: &Path) -> Result<Vec<u32>> {
    let lines = read_lines(path)?;
    let mut labels = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let label = line
            .parse::<u32>()
            .map_err(|_| parse_error(path, i + 1, format!("can't parse label '{}'", line)))?;
        labels.push(label);
    }
    Ok(labels)
}

pub fn write_partition(path: &Path, labels: &[u32]) -> Result<()> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut out = BufWriter::new(file);
    for l in labels {
        writeln!(out, "{}", l).map_err(|e| io_error(path, e))?;
    }
    out.flush().map_err(|e| io_error(path, e))
}
