use std::process::ExitCode;
use std::sync::Arc;

use tracing::info;

use bang::error::StartupError;
use bang::log::RunLog;
use bang::result::{Labels, ResultChannel};
use bang::{cli, config, pool, queue, registry, staging};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run() -> Result<(), StartupError> {
    let opts = cli::parse();
    cli::validate(&opts)?;

    let cfg = config::load_config(&opts.config)?;

    let (staging, staged_path) =
        staging::StagingRoot::bootstrap(&cfg.base_unpack_directory, &opts.file)?;
    let run_log = Arc::new(RunLog::open(&staging.logs_dir)?);

    info!(
        "starting scan file={} staging={} threads={}",
        opts.file.display(),
        staging.root.display(),
        cfg.threads
    );

    let task_queue = queue::TaskQueue::new();
    task_queue.put(queue::Task {
        path: staged_path,
        labels: Labels::from_iter(["root".to_string()]),
    });

    let results = ResultChannel::new();
    let ctx = Arc::new(pool::PoolContext {
        registry: Arc::new(registry::default_registry()),
        run_log,
        staging_root: staging.unpack_dir.clone(),
        temp_dir: cfg.temporary_directory.clone(),
        results_tx: results.sender(),
    });

    let _workers = pool::spawn(cfg.threads, ctx, task_queue.handle());
    task_queue.join();

    info!(
        "scan complete results={} accumulated={}",
        staging.results_dir.display(),
        results.drain().len()
    );
    Ok(())
}
