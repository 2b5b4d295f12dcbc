use clap::Parser;
use std::{process, sync::Arc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use blueprint::{
    cli::{Cli, resolve_spec_path},
    error::Result,
    execution::{Dispatcher, RunOutcome},
    output::TerminalSink,
    task::TaskList,
    util::naive_pluralise,
};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    match run_blueprint(args).await {
        Ok(outcome) if outcome.succeeded() => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "blueprint=debug"
    } else {
        "blueprint=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run_blueprint(args: Cli) -> Result<RunOutcome> {
    let path = resolve_spec_path(&args.paths)?;
    let task_list = TaskList::load(&path)?;

    info!(
        "Blueprint {}started from {}, found {} {}.",
        if task_list.name.is_empty() {
            String::new()
        } else {
            format!("{} ", task_list.name)
        },
        path.display(),
        task_list.len(),
        naive_pluralise("task", task_list.len())
    );

    if args.list {
        print!("{}", task_list);
        return Ok(RunOutcome::default());
    }

    let plan = task_list.constrain(
        &args.explicit_tasks(),
        args.from.as_deref(),
        args.to.as_deref(),
    )?;

    if plan.is_empty() {
        warn!("No tasks to run.");
        return Ok(RunOutcome::default());
    }

    if plan.len() < task_list.len() {
        let ids: Vec<&str> = plan.iter().map(|task| task.id.as_str()).collect();
        info!(
            "Task list has been constrained to {} {}: {}",
            plan.len(),
            naive_pluralise("task", plan.len()),
            ids.join(", ")
        );
    }

    if args.dry_run {
        println!("Dry run mode - showing what would be executed:");
        for task in &plan {
            println!("  {} would run: {}", task.id, task.command);
        }
        return Ok(RunOutcome::default());
    }

    let default_timeout = args.timeout.or_else(|| task_list.default_timeout.clone());
    let sink = Arc::new(Mutex::new(TerminalSink::new(args.output)));
    let dispatcher = Dispatcher::new(&task_list, sink, default_timeout);
    let outcome = dispatcher.run(&plan).await;

    if outcome.succeeded() {
        info!(
            "Finished {} {} without failures.",
            outcome.task_count,
            naive_pluralise("task", outcome.task_count)
        );
    } else {
        warn!(
            "{} of {} {} failed: {}",
            outcome.failure_count(),
            outcome.task_count,
            naive_pluralise("task", outcome.task_count),
            outcome.failures.join(", ")
        );
    }

    Ok(outcome)
}
