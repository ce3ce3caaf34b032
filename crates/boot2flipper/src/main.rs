use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use boot2flipper::{build_virtual_fs, DeviceConfig, DEFAULT_TOTAL_SECTORS};

#[derive(Debug, Parser)]
#[command(name = "boot2flipper", about = "Render a virtual iPXE boot disk image")]
struct Args {
    /// Path to the device configuration TOML file. Falls back to defaults if missing.
    #[arg(long, default_value = "boot2flipper.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Renders the full disk image to a file by reading every sector in order.
    Render {
        #[arg(long, default_value = "boot2flipper.img")]
        out: PathBuf,
    },
    /// Prints the rendered iPXE boot script and validates it.
    ShowScript,
    /// Writes a default configuration file at `--config`.
    Init,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Init => {
            let config = DeviceConfig::default();
            config
                .save(&args.config)
                .with_context(|| format!("writing {}", args.config.display()))?;
            println!("wrote default configuration to {}", args.config.display());
        }
        Command::ShowScript => {
            let config = DeviceConfig::load_or_default(&args.config);
            let script = boot2flipper::render_boot_script(&config);
            boot2flipper::validate_boot_script(&script).context("generated script failed validation")?;
            print!("{script}");
        }
        Command::Render { out } => {
            let config = DeviceConfig::load_or_default(&args.config);
            let mut vfs = build_virtual_fs(&config, DEFAULT_TOTAL_SECTORS)
                .context("building virtual filesystem")?;
            let mut file = std::fs::File::create(&out)
                .with_context(|| format!("creating {}", out.display()))?;
            let mut sector = [0u8; hadris_part::SECTOR_SIZE];
            for lba in 0..DEFAULT_TOTAL_SECTORS {
                vfs.read_sector(lba, &mut sector);
                file.write_all(&sector)
                    .with_context(|| format!("writing sector {lba}"))?;
            }
            println!(
                "rendered {} sectors ({} MiB) to {}",
                DEFAULT_TOTAL_SECTORS,
                DEFAULT_TOTAL_SECTORS as u64 * hadris_part::SECTOR_SIZE as u64 / (1024 * 1024),
                out.display()
            );
        }
    }

    Ok(())
}
