use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rollcall::config::{parse_backend, parse_identification};
use rollcall::{
    init_logging, AttendanceClient, AttendanceService, AttendanceSession, CalcOutcome,
    GlobalConfig, ProcessingMode, Recording, RecordingSession, SampleSet, UploadForm,
};
use rollcall_media::capture::get_platform_capture;
use rollcall_media::{export_samples, load_exported};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Attendance service root URL
    #[arg(long, global = true)]
    server: Option<String>,
    /// Number of frames to sample
    #[arg(short = 'n', long, global = true)]
    frames: Option<usize>,
    /// Processing mode requested from the service (static or dynamic)
    #[arg(long, global = true)]
    mode: Option<ProcessingMode>,
    /// Identification field sent with the upload, as name=value
    #[arg(long = "field", global = true)]
    fields: Vec<String>,
    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record from the camera, then sample
    Record {
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
        /// Camera device, platform default when omitted
        #[arg(short, long)]
        device: Option<String>,
        /// Capture backend: platform or testsrc
        #[arg(long)]
        backend: Option<String>,
        #[arg(long, default_value_t = false)]
        submit: bool,
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Sample an existing recording
    Sample {
        #[arg(short, long)]
        input: PathBuf,
        /// Wall-clock start of the recording (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Wall-clock end of the recording (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long, default_value_t = false)]
        submit: bool,
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Submit a previously exported sample set
    Submit {
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Check that the service is reachable
    Ping,
    /// List camera devices and check the ffmpeg tools
    Devices,
}

fn load_config(cli: &Cli) -> Result<GlobalConfig> {
    let mut config = GlobalConfig::from_env().context("Failed to read ROLLCALL_* variables")?;

    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(frames) = cli.frames {
        config.frame_count = frames;
    }
    if let Some(mode) = cli.mode {
        config.processing_mode = mode;
    }
    for field in &cli.fields {
        config.identification.extend(parse_identification(field)?);
    }
    config.debug_logging |= cli.verbose;

    if let Commands::Record {
        device, backend, ..
    } = &cli.command
    {
        if let Some(device) = device {
            config.recorder.device = Some(device.clone());
        }
        if let Some(backend) = backend {
            config.recorder.backend = match parse_backend(backend) {
                Some(backend) => backend,
                None => bail!("Unknown capture backend {:?}", backend),
            };
        }
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_samples(set: &SampleSet) {
    println!(
        "Sampled {} frames ({} captured) at {:?} intervals",
        set.len(),
        set.captured(),
        set.interval()
    );
    for sample in set.samples() {
        println!(
            "  #{:02} +{:>7.3}s  {}{}",
            sample.index,
            sample.offset.as_secs_f64(),
            sample.label,
            if sample.padded { "  (padded)" } else { "" }
        );
    }
}

async fn export(set: &SampleSet, dir: &Path, mode: ProcessingMode) -> Result<()> {
    let manifest = export_samples(set, dir, Some(mode.as_str()))
        .await
        .with_context(|| format!("Failed to export frames to {}", dir.display()))?;
    println!("Exported {} frames to {}", manifest.frame_count, dir.display());
    Ok(())
}

fn print_outcome(outcome: &CalcOutcome) {
    let CalcOutcome::Completed { results_url, time } = outcome;
    println!("Attendance computed: {}", results_url);
    if let Some(time) = time {
        println!("Server time: {}", time);
    }
}

async fn sample_and_finish(
    mut session: AttendanceSession,
    recording: Option<RecordingSession>,
    export_dir: Option<PathBuf>,
    submit: bool,
    mode: ProcessingMode,
) -> Result<()> {
    let set = match recording {
        Some(recording) => session.sample_recording(recording).await?,
        None => session.stop_and_sample().await?,
    };
    print_samples(set);

    if let Some(dir) = export_dir {
        export(set, &dir, mode).await?;
    }

    if submit {
        let outcome = session.submit().await.context("Submission failed")?;
        print_outcome(&outcome);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.debug_logging)?;

    match cli.command {
        Commands::Record {
            seconds,
            submit,
            export,
            ..
        } => {
            let mode = config.processing_mode;
            let mut session = AttendanceSession::builder(config).build()?;
            session
                .start_recording()
                .await
                .context("Failed to start recording")?;
            info!("Recording for {} seconds", seconds);
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            sample_and_finish(session, None, export, submit, mode).await?;
        }
        Commands::Sample {
            input,
            start,
            end,
            submit,
            export,
        } => {
            if !input.exists() {
                bail!("Recording {} does not exist", input.display());
            }
            let mode = config.processing_mode;
            let recording = RecordingSession::new(Recording::from_file(input), start, end)?;
            let session = AttendanceSession::builder(config).build()?;
            sample_and_finish(session, Some(recording), export, submit, mode).await?;
        }
        Commands::Submit { manifest } => {
            let exported = load_exported(&manifest)
                .await
                .with_context(|| format!("Failed to read {}", manifest.display()))?;
            let mode = match &exported.manifest.processing_mode {
                Some(mode) => mode
                    .parse::<ProcessingMode>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid processing mode in manifest")?,
                None => config.processing_mode,
            };

            let mut form = UploadForm::new(exported.image_urls, exported.manifest.labels, mode);
            form.fields = config.identification.clone();

            let client = AttendanceClient::new(config.client_config())?;
            let outcome = client.submit(&form).await.context("Submission failed")?;
            print_outcome(&outcome);
        }
        Commands::Devices => {
            let capture = get_platform_capture();
            println!("Capture backend: {}", capture.name());
            for device in capture.get_devices()? {
                println!("  {}", device);
            }
            config
                .tools()
                .check()
                .await
                .context("ffmpeg tools are not usable")?;
            println!("ffmpeg and ffprobe OK");
        }
        Commands::Ping => {
            let client = AttendanceClient::new(config.client_config())?;
            let health = client.health().await.context("Service unreachable")?;
            println!(
                "{}: {}",
                health.status,
                health.message.as_deref().unwrap_or("no message")
            );
        }
    }

    Ok(())
}
