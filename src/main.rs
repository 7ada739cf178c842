// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! kestrel CLI - runs scripts and one-liners on the kestrel engine

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kestrel_engine::{AsyncEngine, CompilerOptions, EngineOptions, Value};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "kestrel",
    about = "A compact ES3-subset JavaScript engine",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// JavaScript files to execute, in order
    scripts: Vec<PathBuf>,

    /// Evaluate script from command line
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Throw a ReferenceError on assignment to undeclared names
    #[arg(long)]
    strict: bool,

    /// Emit loops with the condition evaluated before the body only
    #[arg(long)]
    no_loop_rotation: bool,

    /// Maximum nesting of function calls
    #[arg(long, default_value_t = 256)]
    max_call_depth: usize,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn engine_options(&self) -> EngineOptions {
        let compiler = CompilerOptions::default().loop_rotation(!self.no_loop_rotation);
        EngineOptions::default()
            .compiler(compiler)
            .strict(self.strict)
            .max_call_depth(self.max_call_depth)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "kestrel_engine=debug"
    } else {
        "kestrel_engine=warn"
    };
    let filter = EnvFilter::try_from_env("KESTREL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let engine = AsyncEngine::with_options(cli.engine_options());

    if let Some(code) = &cli.eval {
        return Ok(exit_code(report(engine.eval(code).await, true)));
    }

    if cli.scripts.is_empty() {
        // Read from stdin
        let mut code = String::new();
        std::io::stdin().read_to_string(&mut code)?;
        return Ok(exit_code(report(engine.eval(&code).await, true)));
    }

    for result in engine.eval_files(cli.scripts.as_slice()).await {
        if !report(result, false) {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints an evaluation outcome; inline code also echoes its value.
fn report(result: Result<Value, kestrel_engine::Error>, echo: bool) -> bool {
    match result {
        Ok(value) => {
            if echo && !value.is_undefined() {
                println!("{}", value);
            }
            true
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            false
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
