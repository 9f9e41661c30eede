use std::io::Write;
use std::time::Duration;

use clap::Args;
use pomodoromono_core::{Config, FocusSession, ProgressSnapshot, SessionHandle, SessionOptions};
use tracing::debug;

const BAR_WIDTH: usize = 30;
const REDRAW_PERIOD: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct RunArgs {
    /// Preset duration in minutes; must be one of `timer.presets`
    #[arg(long, conflicts_with = "custom")]
    minutes: Option<u32>,
    /// Duration typed as free text (digits only, clamped to 1-240)
    #[arg(long)]
    custom: Option<String>,
    /// Print the final state as JSON instead of drawing progress
    #[arg(long)]
    json: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(args, config))
}

async fn run_session(args: RunArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let session = FocusSession::spawn(SessionOptions::from(&config));

    if let Some(minutes) = args.minutes {
        if session.select_preset(minutes).await?.is_none() {
            let view = session.describe().await?;
            session.shutdown().await?;
            return Err(format!(
                "{minutes} is not a configured preset (available: {})",
                preset_list(&view.presets)
            )
            .into());
        }
    }
    if let Some(text) = args.custom.as_deref() {
        if session.submit_custom_duration(text).await?.is_none() {
            session.shutdown().await?;
            return Err(format!("invalid duration: {text:?}").into());
        }
    }

    let mut status = session.watch_status();
    let mut redraw = tokio::time::interval(REDRAW_PERIOD);
    session.start().await?;

    let interrupted = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break true,
            changed = status.changed() => {
                if changed.is_err() || status.borrow_and_update().has_finished {
                    break false;
                }
            }
            _ = redraw.tick() => {
                if !args.json {
                    draw(&session).await?;
                }
            }
        }
    };

    if !args.json {
        draw(&session).await?;
        println!();
    }
    let view = session.describe().await?;
    session.shutdown().await?;
    debug!(interrupted, "session ended");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.snapshot)?);
    } else if interrupted {
        println!("stopped at {}", view.clock);
    } else {
        println!("focus complete");
    }
    Ok(())
}

async fn draw(session: &SessionHandle) -> Result<(), Box<dyn std::error::Error>> {
    let view = session.describe().await?;
    let animated = session.animated_snapshot();
    let mut stdout = std::io::stdout().lock();
    write!(
        stdout,
        "\r{:>6}  [{}]  {:<14}",
        view.clock,
        bar(&animated),
        view.label.as_str()
    )?;
    stdout.flush()?;
    Ok(())
}

fn preset_list(presets: &[u32]) -> String {
    presets
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn bar(snapshot: &ProgressSnapshot) -> String {
    let filled = ((snapshot.ratio * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_with_ratio() {
        let full = bar(&ProgressSnapshot::from_ratio(1.0, false));
        assert_eq!(full, "#".repeat(BAR_WIDTH));
        let empty = bar(&ProgressSnapshot::from_ratio(0.0, true));
        assert_eq!(empty, "-".repeat(BAR_WIDTH));
        let half = bar(&ProgressSnapshot::from_ratio(0.5, false));
        assert_eq!(half.matches('#').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn preset_list_joins_in_order() {
        assert_eq!(preset_list(&[15, 25, 45]), "15, 25, 45");
        assert_eq!(preset_list(&[5]), "5");
    }
}
