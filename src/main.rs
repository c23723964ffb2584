mod cli;

use tivoshare::{config, Reply, TivoQuery, VideoShare};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tivoshare_av::transcode::stream_video;
use tivoshare_av::{FfmpegTranscoder, InfoCache, TranscodePlan, Transcoder};
use tivoshare_common::Tsn;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = config::load_config_or_default(cli.config.as_deref());
    let config_debug = loaded.as_ref().map(|c| c.server.debug).unwrap_or(false);

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tivoshare=trace,tivoshare_av=debug".to_string()
        } else if config_debug {
            "tivoshare=debug,tivoshare_av=debug".to_string()
        } else {
            "tivoshare=info,tivoshare_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query {
            container,
            item_count,
            anchor,
            anchor_offset,
            tsn,
        } => {
            let share = VideoShare::from_config(loaded?)?;
            let query = TivoQuery {
                item_count,
                anchor_item: anchor,
                anchor_offset,
                tsn: Tsn::from_header(tsn.as_deref()),
                ..TivoQuery::container(container)
            };
            print_reply(share.query_container(&query))
        }
        Commands::Tvbus {
            container,
            file,
            tsn,
        } => {
            let share = VideoShare::from_config(loaded?)?;
            let query = TivoQuery::container(container)
                .with_file(file)
                .with_tsn(Tsn::from_header(tsn.as_deref()));
            print_reply(share.tvbus_query(&query))
        }
        Commands::Push {
            container,
            file,
            tsn,
        } => {
            let share = VideoShare::from_config(loaded?)?;
            let query = TivoQuery {
                target: Some(tsn),
                ..TivoQuery::container(container).with_file(file)
            };
            let rt = tokio::runtime::Runtime::new()?;
            print_reply(rt.block_on(share.push(&query)))
        }
        Commands::Probe { file, json } => probe_file(&loaded?, &file, json),
        Commands::Precache { share: name } => {
            let share = VideoShare::from_config(loaded?)?;
            let probed = share.pre_cache_share(&name)?;
            println!("Probed {} files in {}", probed, name);
            Ok(())
        }
        Commands::Transcode { file, tsn, output } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(transcode_file(
                &loaded?,
                &file,
                &Tsn::from_header(tsn.as_deref()),
                &output,
            ))
        }
        Commands::CheckTools => check_tools(&loaded?),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("tivoshare {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn print_reply(reply: Reply) -> Result<()> {
    match reply {
        Reply::Xml(body) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            writeln!(stdout)?;
            Ok(())
        }
        Reply::NotFound => anyhow::bail!("Not found"),
        Reply::Redirect(location) => {
            println!("Pushed. Redirect: {}", location);
            Ok(())
        }
        Reply::ServerError(body) => anyhow::bail!("{}", body),
    }
}

fn tool_path(configured: Option<&Path>, name: &str) -> PathBuf {
    tivoshare_av::tools::get_tool_path(name, configured).unwrap_or_else(|_| PathBuf::from(name))
}

fn transcoder(config: &config::Config) -> FfmpegTranscoder {
    FfmpegTranscoder::with_tools(
        Arc::new(InfoCache::new()),
        tool_path(config.server.ffprobe.as_deref(), "ffprobe"),
        tool_path(config.server.ffmpeg.as_deref(), "ffmpeg"),
    )
}

fn probe_file(config: &config::Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let info = transcoder(config).video_info(file)?;

    if json {
        let json_str = serde_json::to_string_pretty(info.as_ref())?;
        println!("{}", json_str);
    } else {
        println!("File: {}", info.file_path.display());
        println!("Container: {}", info.container);
        println!("Size: {} bytes", info.file_size);
        let secs = info.duration_ms / 1000;
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
        if let Some(kbps) = info.kbps {
            println!("Bitrate: {} kbps", kbps);
        }

        match &info.video {
            Some(video) => {
                print!("Video: {} {}x{}", video.codec, video.width, video.height);
                if let Some(ref fps) = video.fps {
                    print!(", {} fps", fps);
                }
                if let Some(ref dar) = video.dar {
                    print!(", {}", dar);
                }
                println!();
            }
            None => println!("Video: none"),
        }

        if let Some(audio) = &info.audio {
            print!("Audio: {}", audio.codec);
            if let Some(kbps) = audio.kbps {
                print!(" {} kbps", kbps);
            }
            if let Some(channels) = audio.channels {
                print!(" {}ch", channels);
            }
            println!();
        }

        println!("Supported: {}", if info.supported { "yes" } else { "no" });
    }

    Ok(())
}

async fn transcode_file(
    config: &config::Config,
    file: &Path,
    tsn: &Tsn,
    output: &Path,
) -> Result<()> {
    let transcoder = transcoder(config);
    let profile = config.profile_for(tsn);
    let verdict = transcoder.tivo_compatible(file, &profile)?;
    let plan = if verdict.compatible {
        TranscodePlan::new()
    } else {
        transcoder.transcode_options(file, &profile)?
    };

    tracing::info!(file = %file.display(), reason = %verdict.reason, "Writing device stream");
    let mut out = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("Failed to create {:?}", output))?;
    let written = stream_video(transcoder.ffmpeg(), file, &verdict, &plan, &mut out).await?;

    println!("{}", verdict.reason);
    println!("Wrote {} bytes to {}", written, output.display());
    Ok(())
}

fn check_tools(config: &config::Config) -> Result<()> {
    println!("Checking external tools...\n");

    let ffmpeg = tool_path(config.server.ffmpeg.as_deref(), "ffmpeg");
    let ffprobe = tool_path(config.server.ffprobe.as_deref(), "ffprobe");
    let tools = tivoshare_av::check_tools(&ffmpeg.to_string_lossy(), &ffprobe.to_string_lossy());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Files that need probing will not be listed.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  GUID: {}", config.guid());
            println!("  Shares: {}", config.shares.len());
            for (name, share) in config.shares() {
                println!(
                    "    {} -> {} ({}{})",
                    name,
                    share.path.display(),
                    share.share_type,
                    if share.precache { ", precache" } else { "" }
                );
            }
            println!("  Devices: {}", config.tivos.len());
            match config.video_extensions() {
                Some(extensions) => println!("  Extensions: {}", extensions.join(", ")),
                None => println!("  Extensions: (probe)"),
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
