//! `iop16` - command-line interface for the iop16 bring-up harness.
//!
//! ```text
//! USAGE:
//!   iop16 layout                     Print the host register map
//!   iop16 ports                      Print the device-side port table
//!   iop16 inspect <image>            Decode an instruction image
//!   iop16 selftest [options]         Run a bring-up against the simulator
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use iop16_driver::chip::{ports, program, window, Block, Register, RegisterMap, Revision};
use iop16_driver::{
    Controller, DeviceBehavior, HandshakeMode, HarnessConfig, Iop16Regs, PollLimit, RomImage,
    RunReport, SimulatedIop16,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iop16", about = "iop16 co-processor bring-up harness", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum RevisionArg {
    Minimal,
    Systest,
    Debug,
}

impl From<RevisionArg> for Revision {
    fn from(arg: RevisionArg) -> Self {
        match arg {
            RevisionArg::Minimal => Self::Minimal,
            RevisionArg::Systest => Self::Systest,
            RevisionArg::Debug => Self::Debug,
        }
    }
}

#[derive(clap::Args)]
struct MapArgs {
    /// Register map revision.
    #[arg(long, value_enum, default_value = "systest")]
    revision: RevisionArg,
    /// Put instruction memory right after the header blocks, with this many
    /// words, instead of the LEON3 hardware layout.
    #[arg(long, value_name = "ROM_WORDS")]
    compact: Option<usize>,
}

impl MapArgs {
    fn map(&self) -> RegisterMap {
        match self.compact {
            Some(rom_words) => RegisterMap::compact(self.revision.into(), rom_words),
            None => RegisterMap::leon3_minimal().with_revision(self.revision.into()),
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the host-visible register map.
    Layout {
        #[command(flatten)]
        map: MapArgs,
    },
    /// Print the device-side I/O port table.
    Ports,
    /// Decode an instruction image file.
    Inspect {
        /// Image file (little-endian 16-bit instructions).
        image: PathBuf,
    },
    /// Run one bring-up against the simulated iop16.
    Selftest {
        #[command(flatten)]
        map: MapArgs,
        /// Handshake mode (verify or handshake).
        #[arg(long, default_value = "verify")]
        mode: HandshakeMode,
        /// Image file; defaults to the built-in self-test program.
        #[arg(long)]
        image: Option<PathBuf>,
        /// Give up after this many polls of the handshake register.
        #[arg(long)]
        max_polls: Option<u64>,
        /// Give up after this many milliseconds.
        #[arg(long, conflicts_with = "max_polls")]
        timeout_ms: Option<u64>,
        /// Polls the simulated device lets pass before answering.
        #[arg(long, default_value_t = 0)]
        answer_after: u64,
        /// Simulated device never answers.
        #[arg(long)]
        silent: bool,
        /// Simulated device reports failure (handshake mode only).
        #[arg(long)]
        fail: bool,
        /// Force instruction slot IDX to read back VAL, e.g. 3=0x41aa.
        #[arg(long, value_name = "IDX=VAL", value_parser = parse_fault)]
        corrupt: Vec<(usize, u16)>,
        /// Prescaler reload value (handshake mode).
        #[arg(long, default_value_t = 9)]
        scaler: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Layout { map } => cmd_layout(&map.map()),
        Cmd::Ports => cmd_ports(),
        Cmd::Inspect { image } => cmd_inspect(&image)?,
        Cmd::Selftest {
            map,
            mode,
            image,
            max_polls,
            timeout_ms,
            answer_after,
            silent,
            fail,
            corrupt,
            scaler,
        } => {
            let image = match image {
                Some(path) => RomImage::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => RomImage::selftest(),
            };
            let limit = match (max_polls, timeout_ms) {
                (Some(n), _) => PollLimit::MaxPolls(n),
                (None, Some(ms)) => PollLimit::Deadline(Duration::from_millis(ms)),
                // A silent device never answers
                (None, None) if silent => PollLimit::MaxPolls(1_000_000),
                (None, None) => PollLimit::Unbounded,
            };
            let behavior = simulated_behavior(mode, answer_after, silent, fail)?;
            let config = HarnessConfig::new(mode)
                .with_poll_limit(limit)
                .with_scaler_reload(scaler);
            cmd_selftest(map.map(), config, behavior, &corrupt, &image)?;
        }
    }

    Ok(())
}

fn simulated_behavior(
    mode: HandshakeMode,
    answer_after: u64,
    silent: bool,
    fail: bool,
) -> Result<DeviceBehavior> {
    if fail && mode != HandshakeMode::ScalerHandshake {
        bail!("--fail only applies to --mode handshake");
    }
    if silent {
        return Ok(DeviceBehavior::Halt);
    }
    Ok(match mode {
        HandshakeMode::VerifyReport => DeviceBehavior::SignalDone {
            after_polls: answer_after,
            status: 0xab,
        },
        HandshakeMode::ScalerHandshake => DeviceBehavior::Acknowledge {
            after_polls: answer_after,
            result: !fail,
        },
    })
}

fn cmd_layout(map: &RegisterMap) {
    let caps = map.capabilities();
    println!("Revision     : {:?}", map.revision());
    println!(
        "Capabilities : timer={} gpio={} dbg={}",
        caps.has_timer, caps.has_gpio, caps.has_debug_register
    );
    println!(
        "Region       : {} words ({:#x} bytes) at {:#010x}",
        map.region_words(),
        map.region_bytes(),
        window::BASE_ADDRESS
    );
    println!();

    for block in Block::ALL {
        println!(
            "{:<8} word {:>3}  {} populated, {} padding",
            block.name(),
            block.base_word(),
            map.populated_fields(block),
            map.stride_padding(block)
        );
        for reg in Register::ALL.iter().filter(|r| r.block() == block) {
            let marker = if map.is_populated(*reg) { "" } else { "  (absent)" };
            println!(
                "    {:<20} +{:#06x}  {:#010x}{marker}",
                reg.to_string(),
                reg.byte_offset(),
                window::bus_address(reg.word_offset())
            );
        }
    }

    let rom = map.rom_range();
    println!();
    println!(
        "rom      words {}..{}  {:#010x}..{:#010x}",
        rom.start,
        rom.end,
        window::bus_address(rom.start),
        window::bus_address(rom.end)
    );
}

fn cmd_ports() {
    for port in 0..=u8::MAX {
        if !ports::is_defined(port) {
            continue;
        }
        match ports::host_view(port) {
            Some(view) => println!("{port:#04x}  {} ({:?} byte)", view.register, view.lane),
            None => println!("{port:#04x}  device-private"),
        }
    }
}

fn cmd_inspect(path: &Path) -> Result<()> {
    if !path.to_string_lossy().ends_with(program::EXTENSION) {
        tracing::warn!("{} does not have a {} extension", path.display(), program::EXTENSION);
    }
    let image = RomImage::from_file(path)?;
    println!("Image        : {}", path.display());
    println!("Instructions : {}", image.len());
    println!("Checksum     : {:#06x}", image.checksum());
    let fits = RegisterMap::leon3_minimal().fits(image.len());
    println!("Fits LEON3   : {}", if fits { "yes" } else { "no" });
    println!();
    for (i, insn) in image.words().enumerate() {
        println!("{i:>5}  {insn:04x}");
    }
    Ok(())
}

fn cmd_selftest(
    map: RegisterMap,
    config: HarnessConfig,
    behavior: DeviceBehavior,
    faults: &[(usize, u16)],
    image: &RomImage,
) -> Result<()> {
    let mut sim = SimulatedIop16::new(map).with_behavior(behavior);
    for &(index, value) in faults {
        if index >= map.rom_words() {
            bail!("fault index {index} outside instruction memory ({} words)", map.rom_words());
        }
        sim.corrupt_rom(index, value);
    }
    tracing::debug!("Simulated device: {behavior:?}, {} faults", faults.len());
    let mut regs = Iop16Regs::new(sim, map)?;

    let report = Controller::new(config).run(image, &mut regs)?;
    print_report(&report);

    if !report.passed() {
        bail!("self-test failed");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Mode         : {}", report.mode);
    println!("Written      : {} instructions", report.words_written);
    println!("Mismatches   : {}", report.mismatches.len());
    for m in &report.mismatches {
        println!(
            "    [{:>4}] expected {:04x}, read {:04x}",
            m.index, m.expected, m.observed
        );
    }
    if let Some(diag) = report.last_diagnostic {
        println!("ctrl.sim     : {diag:#010x}");
    }
    println!("Polls        : {}", report.polls);
    println!("reg.reg      : {:#x}", report.final_status);
    if let Some(result) = report.result {
        println!("Result       : {}", if result == 1 { "pass" } else { "fail" });
    }
}

fn parse_fault(s: &str) -> std::result::Result<(usize, u16), String> {
    let (idx, val) = s
        .split_once('=')
        .ok_or_else(|| format!("expected IDX=VAL, got '{s}'"))?;
    let index = parse_number(idx)?;
    let value = u16::try_from(parse_number(val)?).map_err(|e| e.to_string())?;
    Ok((index, value))
}

fn parse_number(s: &str) -> std::result::Result<usize, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("'{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_syntax() {
        assert_eq!(parse_fault("3=0x41aa"), Ok((3, 0x41aa)));
        assert_eq!(parse_fault("0x10=7"), Ok((16, 7)));
        assert!(parse_fault("3").is_err());
        assert!(parse_fault("3=0x10000").is_err());
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from([
            "iop16", "selftest", "--mode", "handshake", "--compact", "64", "--corrupt", "1=2",
        ])
        .unwrap();
        let Cmd::Selftest { map, mode, corrupt, .. } = cli.command else {
            panic!("expected selftest");
        };
        assert_eq!(mode, HandshakeMode::ScalerHandshake);
        assert_eq!(map.map().rom_words(), 64);
        assert_eq!(corrupt, vec![(1, 2)]);
    }

    #[test]
    fn fail_flag_needs_handshake_mode() {
        assert!(simulated_behavior(HandshakeMode::VerifyReport, 0, false, true).is_err());
        assert!(simulated_behavior(HandshakeMode::VerifyReport, 0, true, true).is_err());
        assert_eq!(
            simulated_behavior(HandshakeMode::ScalerHandshake, 2, false, true).unwrap(),
            DeviceBehavior::Acknowledge {
                after_polls: 2,
                result: false
            }
        );
        assert_eq!(
            simulated_behavior(HandshakeMode::VerifyReport, 0, false, false).unwrap(),
            DeviceBehavior::SignalDone {
                after_polls: 0,
                status: 0xab
            }
        );
    }
}
