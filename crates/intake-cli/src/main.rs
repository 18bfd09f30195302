// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, bail};
use config::Config;
use intake_app::{AppState, ScriptId};
use intake_db::Store;
use runtime::DbRuntime;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `intake --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let store = if options.demo {
        Store::open_memory()?
    } else {
        Store::open(&db_path).with_context(|| {
            format!(
                "open database {} -- if this path is wrong, set [storage].db_path or INTAKE_DB_PATH",
                db_path.display()
            )
        })?
    };
    store.bootstrap()?;

    let demo_script = if options.demo {
        Some(store.seed_demo_data()?)
    } else {
        None
    };

    if options.check_only {
        return Ok(());
    }

    let script_id = select_script(&store, options.script_id, demo_script)?;
    let autosave_window = config.autosave_debounce()?;

    let mut state = AppState::default();
    let mut runtime = DbRuntime::new(&store, script_id);
    intake_tui::run_app(&mut state, &mut runtime, autosave_window)
}

fn select_script(
    store: &Store,
    requested: Option<i64>,
    demo_script: Option<ScriptId>,
) -> Result<ScriptId> {
    if let Some(id) = requested {
        let script_id = ScriptId::new(id);
        // Fail up front so a typo'd id does not open an empty editor.
        store.get_script(script_id)?;
        return Ok(script_id);
    }
    if let Some(script_id) = demo_script {
        return Ok(script_id);
    }

    let scripts = store.list_scripts()?;
    match scripts.first() {
        Some(script) => Ok(script.id),
        None => bail!(
            "no scripts in the database -- run `intake --demo` to explore with seeded data"
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    script_id: Option<i64>,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        script_id: None,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--script" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--script requires a script id"))?;
                let id: i64 = value.as_ref().parse().map_err(|_| {
                    anyhow::anyhow!("--script expects a numeric id, got {:?}", value.as_ref())
                })?;
                options.script_id = Some(id);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("intake");
    println!("  --config <path>          Use a specific config path");
    println!("  --script <id>            Open a specific script");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB without starting the UI");
    println!("  --help                   Show this help");
}
