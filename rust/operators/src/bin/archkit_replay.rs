// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: replay an operation journal over a base mesh.
//!
//! Usage:
//!   archkit-replay <mesh.json> <journal.json> [options]

use archkit_journal::{parse_op_key, Journal};
use archkit_mesh::EditMesh;
use archkit_operators::{Config, Session};
use std::env;
use std::fs;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,archkit_operators=debug".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mesh_path = &args[1];
    let journal_path = &args[2];

    let mut output_path = String::from("replayed.json");
    let mut export: Option<(String, [String; 3])> = None;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--output" => {
                i += 1;
                output_path = args.get(i).cloned().unwrap_or_else(|| usage_error("--output needs a path"));
            }
            "--export" => {
                if i + 4 >= args.len() {
                    usage_error("--export needs <op> <style> <category> <name>");
                }
                export = Some((
                    args[i + 1].clone(),
                    [args[i + 2].clone(), args[i + 3].clone(), args[i + 4].clone()],
                ));
                i += 4;
            }
            other => usage_error(&format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    let base = read(mesh_path).and_then(|text| EditMesh::from_json(&text).map_err(|e| e.to_string()));
    let journal = read(journal_path).and_then(|text| Journal::from_json(&text).map_err(|e| e.to_string()));
    let (base, journal) = match (base, journal) {
        (Ok(base), Ok(journal)) => (base, journal),
        (Err(e), _) | (_, Err(e)) => fail(&e),
    };

    println!(
        "Replaying {} operations over {} faces",
        journal.len(),
        base.face_count()
    );

    let mut session = match Session::with_journal(EditMesh::new(), journal, Config::from_env()) {
        Ok(session) => session,
        Err(e) => fail(&e.to_string()),
    };
    if let Err(e) = session.rebuild(base) {
        fail(&format!("replay failed: {}", e));
    }

    let mesh = session.mesh();
    match mesh.to_json() {
        Ok(json) => {
            if let Err(e) = fs::write(&output_path, json) {
                fail(&format!("cannot write {}: {}", output_path, e));
            }
        }
        Err(e) => fail(&e.to_string()),
    }
    println!(
        "Wrote {} ({} vertices, {} faces, {} instances)",
        output_path,
        mesh.vertex_count(),
        mesh.face_count(),
        mesh.instance_count()
    );

    if let Some((op, [style, category, name])) = export {
        let Some(op) = parse_op_key(&op).or_else(|| op.parse().ok()) else {
            fail(&format!("invalid operation id {}", op));
        };
        match session.export_to_library(op, &style, &category, &name, None) {
            Ok(path) => println!("Exported op{} to {}", op, path.display()),
            Err(e) => fail(&format!("export failed: {}", e)),
        }
    }
}

fn read(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path, e))
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn usage_error(message: &str) -> ! {
    eprintln!("{}", message);
    print_usage();
    process::exit(1);
}

fn print_usage() {
    println!("archkit-replay - rebuild a mesh from its operation journal");
    println!();
    println!("Usage: archkit-replay <mesh.json> <journal.json> [options]");
    println!();
    println!("Options:");
    println!("  --output <path>                          Output mesh JSON (default: replayed.json)");
    println!("  --export <op> <style> <category> <name>  Save op and its descendants to the script library");
    println!();
    println!("Environment:");
    println!("  ARCHKIT_SCRIPT_DIR        Script library root (default: ./scripts)");
    println!("  ARCHKIT_MERGE_DISTANCE    Vertex merge distance (default: 1e-5)");
    println!("  ARCHKIT_MAX_REPLAY        Operator runs allowed per action (default: 10000)");
    println!("  ARCHKIT_INSERT_PERIMETER  Bridge perimeter insertion default (default: true)");
    println!("  RUST_LOG                  Log filter");
}
