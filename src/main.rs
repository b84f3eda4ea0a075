/*
 * Copyright 2022 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! Provides the 'changewithin' cmdline tool.

use anyhow::Context as _;
use std::collections::HashMap;
use std::io::Write;

type Handler = fn(&[String], &mut dyn Write, &changewithin::context::Context) -> i32;

/// Sets up logging to the terminal and to workdir/changewithin.log.
fn setup_logging(ctx: &changewithin::context::Context) -> anyhow::Result<()> {
    let mut builder = simplelog::ConfigBuilder::new();
    builder.set_time_format_custom(simplelog::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));
    // Stays at UTC if the local offset can't be determined.
    let _ = builder.set_time_offset_to_local();
    let config = builder.build();
    let logpath = ctx.get_abspath("workdir/changewithin.log");
    if let Some(parent) = std::path::Path::new(&logpath).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&logpath)
        .with_context(|| format!("failed to create '{logpath}'"))?;
    simplelog::CombinedLogger::init(vec![
        simplelog::TermLogger::new(
            simplelog::LevelFilter::Info,
            config.clone(),
            simplelog::TerminalMode::Stdout,
            simplelog::ColorChoice::Never,
        ),
        simplelog::WriteLogger::new(simplelog::LevelFilter::Info, config, file),
    ])
    .context("failed to init the combined logger")?;
    Ok(())
}

fn process_main(
    args: &[String],
    stream: &mut dyn Write,
    ctx: &changewithin::context::Context,
) -> i32 {
    if let Err(err) = setup_logging(ctx) {
        stream.write_all(format!("{err:?}\n").as_bytes()).unwrap();
        return 1;
    }
    changewithin::process::main(args, stream, ctx)
}

lazy_static::lazy_static! {
    static ref HANDLERS: HashMap<String, Handler> = {
        let mut ret: HashMap<String, Handler> = HashMap::new();
        ret.insert("area".into(), changewithin::process::area_main);
        ret.insert("process".into(), process_main);
        ret
    };
}

fn main() {
    let mut args: Vec<String> = std::env::args().collect();
    let ctx = match changewithin::context::Context::new("") {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{err:?}");
            std::process::exit(1);
        }
    };
    let area = clap::Command::new("area").about("Prints the bbox of the area of interest");
    let process = clap::Command::new("process")
        .about("Finds the changesets of an OsmChange file which touched watched tags in the area")
        .arg(clap::Arg::new("osc").required(true));
    let subcommands = vec![area, process];
    let app = clap::Command::new("changewithin").subcommand_required(true);
    let matches = app
        .subcommands(subcommands)
        .try_get_matches_from(&args)
        .unwrap_or_else(|e| e.exit());
    args.remove(1);
    let handler: &Handler = match matches.subcommand().and_then(|(name, _)| HANDLERS.get(name)) {
        Some(value) => value,
        None => std::process::exit(1),
    };

    std::process::exit(handler(&args, &mut std::io::stdout(), &ctx))
}
