mod hooks;
mod host;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_print::cprintln;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use vmgp::{Image, Interpreter, VmConfig, VmSystem};

use hooks::{dump::Dump, trace::Trace, Hook};

#[derive(Parser, Debug)]
#[clap(
    name = "VMGP Emulator",
    version = "v0.1.0",
    about = "Runs VMGP programs on the PIP2 interpreter"
)]
struct Args {
    #[arg(short = 't', long)]
    tmax: Option<u64>,

    /// VM configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    dump_cfg: Option<String>,

    #[arg(short = 'a', long)]
    dump_all: bool,

    /// Print every executed instruction
    #[arg(long)]
    trace: bool,

    /// Program manifest (YAML)
    #[arg(default_value = "main.vmgp.yaml")]
    input_file: PathBuf,
}

enum Exit {
    Terminated,
    Limit,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    println!("VMGP Emulator");

    println!("+-----------------------------------------------+");
    println!("| {:<45} |", args.input_file.display());
    println!("+-----------------------------------------------+");

    match run(args) {
        Ok((exit, ticks)) => {
            match exit {
                Exit::Terminated => cprintln!("<g>Terminated</> by program after {} instructions", ticks),
                Exit::Limit => cprintln!("<y>Stopped</> at instruction limit after {} instructions", ticks),
            }
            println!("=================================================");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            cprintln!("<r,s>Error</>: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(Exit, u64), vmgp::Error> {
    let config = match &args.config {
        Some(path) => VmConfig::from_file(path)?,
        None => VmConfig::default(),
    };
    debug!(?config, "vm configuration");

    // ------------------------------------------------------------------------
    // Load program
    let image = Image::from_manifest(&args.input_file)?;
    let system = VmSystem::new(&image, &host::module_calls(), &config)?;
    let mut cpu: Interpreter = system.into_interpreter();

    // ------------------------------------------------------------------------
    // Initialize hooks
    println!("[INIT]");
    let mut hooks: Vec<Box<dyn Hook>> = vec![
        Box::new(Dump::arg(args.dump_cfg, args.dump_all)?),
        Box::new(Trace::arg(args.trace)),
    ];
    cpu = hooks.iter_mut().fold(cpu, |cpu, hook| hook.init(cpu));

    // ------------------------------------------------------------------------
    // Main loop
    for time in match args.tmax {
        Some(t) => 0_u64..t,
        None => 0_u64..u64::MAX,
    } {
        let (addr, inst) = cpu.exec()?;
        cpu = hooks
            .iter_mut()
            .fold(cpu, |cpu, hook| hook.exec(time, addr, inst, cpu));
        if cpu.is_terminated() {
            return Ok((Exit::Terminated, cpu.ticks()));
        }
    }
    Ok((Exit::Limit, cpu.ticks()))
}
