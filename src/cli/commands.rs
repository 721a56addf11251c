use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "clique-provisioner")]
pub struct Opt {
    #[arg(long, global = true, help = "TOML file with provisioning settings")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "provision",
        about = "Create accounts, genesis and nodes, then peer them"
    )]
    Provision {
        #[arg(long = "nodes", default_value_t = 3, help = "Number of nodes")]
        num_nodes: usize,
        #[arg(long = "chain-id", help = "Chain id (defaults to the configured one)")]
        chain_id: Option<u64>,
    },
    #[command(name = "nodes", about = "List provisioned node directories")]
    Nodes,
    #[command(name = "records", about = "List persisted cluster records")]
    Records,
    #[command(name = "health", about = "Print a liveness report")]
    Health,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_defaults() {
        let opt = Opt::try_parse_from(["clique-provisioner", "provision"]).unwrap();
        match opt.command {
            Command::Provision {
                num_nodes,
                chain_id,
            } => {
                assert_eq!(num_nodes, 3);
                assert_eq!(chain_id, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(opt.config.is_none());
    }

    #[test]
    fn test_provision_arguments() {
        let opt = Opt::try_parse_from([
            "clique-provisioner",
            "provision",
            "--nodes",
            "5",
            "--chain-id",
            "99",
            "--config",
            "cluster.toml",
        ])
        .unwrap();
        assert!(matches!(
            opt.command,
            Command::Provision {
                num_nodes: 5,
                chain_id: Some(99)
            }
        ));
        assert_eq!(opt.config, Some(PathBuf::from("cluster.toml")));
    }

    #[test]
    fn test_rejects_bad_node_count() {
        assert!(Opt::try_parse_from(["clique-provisioner", "provision", "--nodes", "x"]).is_err());
    }
}
