//! Makes Android ROM zips and boot images installable as a secondary system.

mod logging;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use dualboot_patcher::compress::GzipEncoder;
use dualboot_patcher::config::Config;
use dualboot_patcher::pipeline::patch_file;
use dualboot_patcher::ramdisk::RamdiskStore;
use itertools::Itertools;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "patchfile",
    version,
    about = "Patch a ROM zip or boot image for dual booting"
)]
struct Cli {
    /// ROM zip or boot image to patch.
    #[arg(required_unless_present = "list_ramdisks")]
    file: Option<PathBuf>,

    /// Use this ramdisk from ramdisks.tar.xz instead of the detected one.
    #[arg(long, value_name = "NAME")]
    ramdisk: Option<String>,

    /// Directory containing ramdisks/, patches/ and binaries/.
    #[arg(long, value_name = "DIR", env = "DUALBOOT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Program used to apply patches instead of `patch`.
    #[arg(long, value_name = "PATH", env = "DUALBOOT_PATCH_TOOL")]
    patch_tool: Option<PathBuf>,

    /// Create temporary directories here.
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// Compress ramdisks with zopfli. Smaller, much slower.
    #[arg(long)]
    zopfli: bool,

    /// Print the available ramdisks and exit.
    #[arg(long)]
    list_ramdisks: bool,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let data_dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => Config::default_data_dir()?,
        };
        let mut config = Config::new(data_dir);
        config.patch_tool = self.patch_tool.clone();
        config.temp_dir = self.temp_dir.clone();
        config.ramdisk_override = self.ramdisk.clone();
        if self.zopfli {
            config.gzip_encoder = GzipEncoder::Zopfli;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    logging::init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    tracing::debug!(?config, "resolved configuration");

    if cli.list_ramdisks {
        let store = RamdiskStore::new(config.ramdisk_archive());
        println!("{}", store.list()?.iter().join("\n"));
        return Ok(());
    }

    if let Some(file) = &cli.file {
        patch_file(&config, file)?;
    }
    Ok(())
}
