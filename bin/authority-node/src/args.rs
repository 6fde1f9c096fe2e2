//! Command-line arguments for the authority node.

use std::path::PathBuf;

use argh::FromArgs;

use crate::config::Config;

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "wDingo bridge authority node")]
pub struct Args {
    #[argh(option, short = 'c', description = "path to the TOML configuration")]
    pub config: PathBuf,

    // Config overriding args
    #[argh(option, short = 'd', description = "datadir path that will contain the database")]
    pub datadir: Option<PathBuf>,

    #[argh(option, description = "rpc listen host")]
    pub rpc_host: Option<String>,

    #[argh(option, description = "rpc listen port")]
    pub rpc_port: Option<u16>,

    #[argh(
        option,
        description = "replace the local store with the given database dump before serving"
    )]
    pub restore_dump: Option<PathBuf>,
}

impl Args {
    pub fn override_config(&self, config: &mut Config) {
        if let Some(datadir) = &self.datadir {
            config.node.datadir.clone_from(datadir);
        }
        if let Some(host) = &self.rpc_host {
            config.node.listen_host.clone_from(host);
        }
        if let Some(port) = self.rpc_port {
            config.node.listen_port = port;
        }
    }
}
