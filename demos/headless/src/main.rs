use anyhow::Result;
use clap::Parser;
use kite_core::{App, AppConfig, Component, Context, Lifecycle, QuitAfter, Service};
use kite_hooks::Priority;
use kite_scheduler::Coroutine;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kite-headless")]
#[command(about = "Runs a Kite app without a window", long_about = None)]
struct Cli {
    /// Number of frames to run before quitting
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// JSON app config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every frame
    #[arg(long)]
    debug: bool,
}

/// Bounces between two walls, moving a fixed distance per second.
struct Ball {
    x: f64,
    velocity: f64,
    bounces: u32,
}

impl Component for Ball {
    fn update(&mut self, cx: &Context) -> Result<()> {
        self.x += self.velocity * cx.delta_seconds();
        if !(0.0..=100.0).contains(&self.x) {
            self.x = self.x.clamp(0.0, 100.0);
            self.velocity = -self.velocity;
            self.bounces += 1;
            tracing::debug!("Ball bounced at frame {}", cx.frames());
        }
        Ok(())
    }

    fn stop(&mut self, _cx: &Context) -> Result<Lifecycle> {
        tracing::info!("Ball bounced {} times, ended at x={:.1}", self.bounces, self.x);
        Ok(Lifecycle::Done)
    }
}

/// Starts a countdown coroutine; the app does not wait for it.
struct Countdown {
    from: u32,
}

impl Component for Countdown {
    fn start(&mut self, _cx: &Context) -> Result<Lifecycle> {
        let from = self.from;
        Ok(Coroutine::from_future(move |y| async move {
            for n in (1..=from).rev() {
                tracing::info!("{}...", n);
                y.frames(60).await;
            }
            tracing::info!("Go!");
        })
        .into())
    }
}

#[derive(Default)]
struct FrameStats;

impl Service for FrameStats {
    fn stop(&mut self, cx: &Context) -> Result<()> {
        let chrono = cx.chrono();
        tracing::info!(
            "Ran {} frames, average {:.0} fps (min {:.0}, max {:.0})",
            cx.frames(),
            chrono.average_fps(),
            chrono.min_fps().unwrap_or(0.0),
            chrono.max_fps().unwrap_or(0.0)
        );
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => AppConfig::default().with_name("headless"),
    };
    config.debug |= cli.debug;

    tracing_subscriber::fmt()
        .with_max_level(if config.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut app = App::new(config).with_events(QuitAfter::new(cli.frames));
    app.add_service(FrameStats)?;
    app.add_component(Ball {
        x: 50.0,
        velocity: 4000.0,
        bounces: 0,
    })?;
    app.add_component(Countdown { from: 3 })?;

    let cx = app.context().clone();
    app.setup.add(move |_| {
        cx.spawn(|y| async move {
            y.seconds(0.25).await;
            tracing::info!("A quarter second has passed");
        })?;
        Ok(())
    });
    app.cleanup.add_with_priority(
        |_| {
            tracing::info!("Goodbye");
            Ok(())
        },
        Priority::Max,
    );

    app.run()?;
    Ok(())
}
