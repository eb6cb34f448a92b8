use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use dt_bridge::PortForward;
use dt_core::config::{ListenConfig, DEFAULT_ADB, DEFAULT_HOST, DEFAULT_PORT};
use dt_core::logging::init_tracing;
use tracing::{error, warn};

const USAGE_EXIT_CODE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "dt-listen")]
#[command(about = "Print events streamed by the device over a forwarded WebSocket")]
#[command(version)]
struct Cli {
    /// Port forwarded from the device
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host the forwarded port listens on
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Device bridge executable
    #[arg(long, env = "DROIDTAP_ADB", default_value = DEFAULT_ADB)]
    adb: String,

    /// Assume the port forward is already in place
    #[arg(long)]
    skip_forward: bool,
}

fn parse_cli() -> Cli {
    Cli::try_parse().unwrap_or_else(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
        _ => {
            let _ = err.print();
            eprintln!("\n{}", Cli::command().render_usage());
            eprintln!("  Default port: {DEFAULT_PORT}");
            std::process::exit(USAGE_EXIT_CODE);
        }
    })
}

#[tokio::main]
async fn main() {
    let cli = parse_cli();
    init_tracing();

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(shutdown);

    if !cli.skip_forward {
        let forward = PortForward::new(cli.port).with_program(&cli.adb);
        tokio::select! {
            forwarded = dt_bridge::setup(&forward) => {
                if !forwarded {
                    warn!("continuing anyway in case the forward is already set up");
                }
            }
            () = &mut shutdown => {
                println!("\nStopped by user");
                return;
            }
        }
    }

    let config = ListenConfig::new(cli.host, cli.port);
    match dt_listen::run_until(&config, std::io::stdout(), &mut shutdown).await {
        Ok(()) => println!("\nStopped by user"),
        Err(err) => error!("{err}"),
    }
}
