// This is my entry point for the cluster provisioner CLI
// I pull in the pipeline plus the real geth binary and HTTP RPC client
use clique_provisioner::provision::response;
use clique_provisioner::utils::unix_seconds;
use clique_provisioner::{
    list_node_dirs, ClusterRegistry, Command, Config, GethBinary, Heartbeat, HttpAdminRpc, Opt,
    ProvisionRequest, Provisioner,
};
use clap::Parser;
use log::{error, LevelFilter};
use serde_json::json;
use std::process;

fn main() {
    // I initialize logging at Info so I can follow every step of a run
    // RUST_LOG still wins when I need the debug-level command lines
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    // I exit with whatever code the command reports; errors before a run exit 1
    match run_command(opt) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Error: {e}");
            process::exit(1);
        }
    }
}

// This is where I handle each CLI command and decide the process exit code
fn run_command(opt: Opt) -> Result<i32, Box<dyn std::error::Error>> {
    // I layer the settings: defaults, then the TOML file, then the environment
    let config = Config::load(opt.config.as_deref())?;

    match opt.command {
        Command::Provision {
            num_nodes,
            chain_id,
        } => {
            // I keep a heartbeat going so I can tell a slow run from a stuck one
            let heartbeat = Heartbeat::spawn(config.heartbeat_interval());
            let binary = GethBinary::new(config.node_command.clone());
            let rpc = HttpAdminRpc::new(config.rpc_host.clone(), config.rpc_timeout())?;

            let mut request = ProvisionRequest::new(num_nodes);
            if let Some(chain_id) = chain_id {
                request = request.with_chain_id(chain_id);
            }
            let result = Provisioner::new(&config, &binary, &rpc).provision(request);
            heartbeat.stop();

            // I always print the structured reply, even for a failed run,
            // and the node processes keep running after I exit

            println!("{}", serde_json::to_string_pretty(&response(&result))?);
            Ok(if result.is_ok() { 0 } else { 1 })
        }
        // When I want to see which node directories exist on disk
        Command::Nodes => {
            let nodes = list_node_dirs(&config.nodes_dir)?;
            println!("{}", serde_json::to_string_pretty(&json!({ "nodes": nodes }))?);
            Ok(0)
        }
        // When I want every cluster record written so far, oldest first
        Command::Records => {
            let records = ClusterRegistry::new(&config.out_dir).list()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "records": records }))?
            );
            Ok(0)
        }
        // A quick liveness check for whoever supervises me
        Command::Health => {
            println!("{}", json!({ "status": "ok", "time": unix_seconds() }));
            Ok(0)
        }
    }
}
