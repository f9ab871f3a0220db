mod args;

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use args::{Args, Commands, WatchArgs};
use clap::Parser;
use publisher::{
    collection::{Builder, Snapshot},
    config::{Config, StoriesConfig},
    error::PublisherErr,
    monitor::{ChangeMonitor, ReloadHooks},
    site::Site,
    store::SnapshotStore,
    templating::Templates,
    watch::PollWatcher,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Regenerates the site whenever the monitor swaps templates or stories.
struct Regenerate {
    site: Arc<Site>,
    store: Arc<SnapshotStore>,
}

impl ReloadHooks for Regenerate {
    async fn recompile_templates(&self) -> Result<(), PublisherErr> {
        self.site.templates().recompile()?;
        if let Some(snapshot) = self.store.get() {
            self.site.generate(&snapshot).await?;
        }
        Ok(())
    }

    async fn snapshot_replaced(&self, snapshot: Arc<Snapshot>) -> Result<(), PublisherErr> {
        self.site.generate(&snapshot).await
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.tracing_level_filter())
        .compact()
        .init();

    if let Err(e) = run(args).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), PublisherErr> {
    let start = Instant::now();
    let config = Arc::new(Config::try_from(args.content.as_path())?);
    let stories_dir = args.content.join(&config.layout.stories);
    let templates_dir = args.content.join(&config.layout.templates);
    let static_dir = args.content.join(&config.layout.static_files);

    if !args.prod {
        warn!("draft mode: draft stories are included");
    }

    let templates = Arc::new(Templates::load(&templates_dir)?);
    let builder = Arc::new(Builder::with_markdown(StoriesConfig::new(
        stories_dir.clone(),
        args.prod,
    ))?);
    let store = Arc::new(SnapshotStore::new());
    let site = Arc::new(Site::new(
        args.out.clone(),
        static_dir,
        config.clone(),
        templates,
    ));

    {
        let snapshot = store.rebuild(&builder).await?;
        site.generate(&snapshot).await?;
    }
    info!("done in {:?}", start.elapsed());

    match args.command.unwrap_or(Commands::Build) {
        Commands::Build => Ok(()),
        Commands::Watch(watch_args) => {
            watch(watch_args, stories_dir, templates_dir, builder, store, site).await
        }
    }
}

async fn watch(
    args: WatchArgs,
    stories_dir: PathBuf,
    templates_dir: PathBuf,
    builder: Arc<Builder>,
    store: Arc<SnapshotStore>,
    site: Arc<Site>,
) -> Result<(), PublisherErr> {
    let (tx, rx) = mpsc::channel(64);
    let watcher = PollWatcher::new(
        vec![stories_dir, templates_dir.clone()],
        Duration::from_millis(args.interval_ms),
    )
    .await?;
    let watcher = tokio::spawn(watcher.run(tx));

    let monitor = ChangeMonitor::new(
        templates_dir,
        builder,
        store.clone(),
        Regenerate { site, store },
    );

    info!("watching for changes, press Ctrl-C to stop");
    let interrupted = tokio::select! {
        _ = monitor.run(rx) => None,
        signal = tokio::signal::ctrl_c() => Some(signal),
    };

    match interrupted {
        Some(signal) => {
            watcher.abort();
            signal?;
            info!("stopping");
            Ok(())
        }
        // The watcher only drops its sender when its task dies.
        None => match watcher.await {
            Ok(()) => Ok(()),
            Err(err) => Err(format!("watcher task failed: {err}").into()),
        },
    }
}
