//! cfdmesh CLI - convert legacy VTK snapshots and inspect C4A containers.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cfdmesh::container::{read_mesh, IStream};
use cfdmesh::pipeline::{convert, ConvertOptions, DEFAULT_SLICE_BUDGET};
use cfdmesh::{container::format, Result};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut filter = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => filter = "debug",
            "-vv" | "--trace" => filter = "trace",
            "-q" | "--quiet" => filter = "error",
            _ => filtered_args.push(arg),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if filtered_args.is_empty() {
        print_usage(&args[0]);
        return ExitCode::SUCCESS;
    }

    let res = match filtered_args[0] {
        "convert" | "c" => {
            if filtered_args.len() < 3 {
                eprintln!(
                    "Usage: {} convert <out.c4a> <in.vtk>... [--slice[=N]] [--v1]",
                    args[0]
                );
                return ExitCode::FAILURE;
            }
            cmd_convert(&filtered_args[1..])
        }
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Usage: {} info <file.c4a>", args[0]);
                return ExitCode::FAILURE;
            }
            cmd_info(filtered_args[1])
        }
        "help" | "h" | "-h" | "--help" => {
            print_usage(&args[0]);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(&args[0]);
            return ExitCode::FAILURE;
        }
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_convert(args: &[&str]) -> Result<()> {
    let mut opts = ConvertOptions::default();
    let mut output: Option<PathBuf> = None;
    let mut inputs: Vec<PathBuf> = Vec::new();

    for arg in args {
        if *arg == "--slice" {
            opts.slice_budget = Some(DEFAULT_SLICE_BUDGET);
        } else if let Some(n) = arg.strip_prefix("--slice=") {
            let budget = n
                .parse()
                .map_err(|_| cfdmesh::Error::format(format!("bad slice budget {:?}", n)))?;
            opts.slice_budget = Some(budget);
        } else if *arg == "--v1" {
            opts.version = format::VERSION_1;
        } else if output.is_none() {
            output = Some(PathBuf::from(arg));
        } else {
            inputs.push(PathBuf::from(arg));
        }
    }

    let output = output.ok_or_else(|| cfdmesh::Error::format("missing output path"))?;
    let mesh = convert(&inputs, &output, &opts)?;
    println!(
        "{}: {} submesh(es), {} time step(s), {} triangles",
        output.display(),
        mesh.submeshes.len(),
        mesh.time_step_count,
        mesh.submeshes.iter().map(|s| s.triangle_count()).sum::<usize>()
    );
    Ok(())
}

fn cmd_info(path: &str) -> Result<()> {
    let mut inp = IStream::open(path)?;
    let version = inp.read_u32()?;
    drop(inp);

    let mesh = read_mesh(path)?;
    println!("File:       {}", Path::new(path).display());
    println!("Version:    {}", version);
    println!("Mesh:       {:?}", mesh.name);
    println!("Bounds:     {:?}", mesh.bbox);
    println!("Time steps: {}", mesh.time_step_count);
    println!("Submeshes:  {}", mesh.submeshes.len());
    for sub in &mesh.submeshes {
        let attribs: Vec<&str> = sub
            .scalar_attribs
            .keys()
            .chain(sub.vector_attribs.keys())
            .map(String::as_str)
            .collect();
        println!(
            "  {:?}: {} vertices, {} triangles, attributes [{}]",
            sub.name,
            sub.vertex_count(),
            sub.triangle_count(),
            attribs.join(", ")
        );
    }
    Ok(())
}

fn print_usage(prog: &str) {
    println!("cfdmesh CLI - Convert legacy VTK snapshots to C4A containers");
    println!();
    println!("Usage: {} [options] <command> ...", prog);
    println!();
    println!("Commands:");
    println!("  c, convert <out.c4a> <in.vtk>...   Convert snapshots (time order)");
    println!("       --slice[=N]   Slice submeshes over N vertices (default {})", DEFAULT_SLICE_BUDGET);
    println!("       --v1          Write the flat v1 container");
    println!("  i, info <file.c4a>                 Show container summary");
    println!("  h, help                            Show this help");
    println!();
    println!("Options:");
    println!("  -v, --verbose  Debug output");
    println!("  -vv, --trace   Trace output (very verbose)");
    println!("  -q, --quiet    Errors only");
}
