
mod counters;
mod defs;
mod dmx;
mod ehub;
mod emitter;
mod mapping;
mod messages;
mod observer;
mod patch;
mod receiver;
mod router;
mod service;
mod state;
mod universes;

use error_stack::{Result, ResultExt};
use log::{debug, error, info};
use rustop::opts;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use defs::{MappingRangeDef, PatchConfig, RouterOptions};
use service::ServiceConfig;

#[derive(Debug, Error)]
enum ConfigFileError {
    #[error("Cannot read {0}")]
    Read(String),

    #[error("Cannot parse {0}")]
    Parse(String),
}

fn load_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, ConfigFileError> {
    let raw = std::fs::read(path).change_context_lazy(|| ConfigFileError::Read(path.to_string()))?;
    serde_json::from_slice(&raw).change_context_lazy(|| ConfigFileError::Parse(path.to_string()))
}

#[tokio::main]
async fn main() {
    let (args, _) = opts! {
        synopsis "eHuB to ArtNet DMX router";
        param mapping:String, desc: "Mapping configuration file (JSON list of entity ranges)";
        opt patch:Option<String>, desc: "Patch configuration file (JSON rules + enabled flag)";
        opt bind:String=String::from("0.0.0.0"), desc: "Address to listen on for eHuB datagrams";
        opt port:u16=8765, desc: "UDP port to listen on for eHuB datagrams";
        opt options:Option<String>, desc: "Runtime options file (JSON, all fields optional)";
    }.parse_or_exit();

    env_logger::init();
    error_stack::Report::set_color_mode(error_stack::fmt::ColorMode::None);

    println!("{}", get_version());

    let mapping = match load_json::<Vec<MappingRangeDef>>(&args.mapping) {
        Ok(mapping) => mapping,
        Err(e) => {
            error!("Mapping configuration: {:?}", e);
            std::process::exit(1);
        }
    };

    let patch = match args.patch {
        Some(ref path) => match load_json::<PatchConfig>(path) {
            Ok(patch) => patch,
            Err(e) => {
                error!("Patch configuration: {:?}", e);
                std::process::exit(1);
            }
        },
        None => PatchConfig::default(),
    };

    let options = match args.options {
        Some(ref path) => match load_json::<RouterOptions>(path) {
            Ok(options) => options,
            Err(e) => {
                error!("Runtime options: {:?}", e);
                std::process::exit(1);
            }
        },
        None => RouterOptions::default(),
    };

    let listen_addr = match args.bind.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, args.port),
        Err(e) => {
            error!("Invalid bind address '{}': {}", args.bind, e);
            std::process::exit(1);
        }
    };

    let config = ServiceConfig {
        listen_addr,
        mapping,
        patch,
        options,
    };

    let service = match service::Service::new(config).start().await {
        Ok(service) => service,
        Err(e) => {
            error!("Cannot start router: {:?}", e);
            std::process::exit(1);
        }
    };

    println!("Listening for eHuB on {}", service.local_addr());

    // Feed the structured event stream to the log; monitor windows
    // subscribe the same way.
    let events = service.subscribe();
    tokio::spawn(async move {
        while let Ok(envelope) = events.recv().await {
            if let Ok(json) = serde_json::to_string(&envelope) {
                debug!("event: {}", json);
            }
        }
    });

    wait_for_shutdown(&service, &args.mapping, args.patch.as_deref()).await;

    let service = service.stop().await;
    info!("Final counters: {:?}", service.counters());
}

/// Blocks until Ctrl-C. On Unix, SIGHUP reloads the mapping and patch files
/// and swaps them in without dropping a frame; a file that fails validation
/// leaves the running snapshots untouched.
#[cfg(unix)]
async fn wait_for_shutdown(
    service: &service::Service<service::Started>,
    mapping_path: &str,
    patch_path: Option<&str>,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).unwrap();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            _ = hangup.recv() => {
                info!("SIGHUP: reloading configuration");

                match load_json::<Vec<MappingRangeDef>>(mapping_path) {
                    Ok(mapping) => {
                        if let Err(e) = service.swap_mapping(&mapping) {
                            error!("Mapping not swapped: {:?}", e);
                        }
                    }
                    Err(e) => error!("Mapping not reloaded: {:?}", e),
                }

                if let Some(path) = patch_path {
                    match load_json::<PatchConfig>(path) {
                        Ok(patch) => {
                            if let Err(e) = service.swap_patch(&patch) {
                                error!("Patch not swapped: {:?}", e);
                            }
                        }
                        Err(e) => error!("Patch not reloaded: {:?}", e),
                    }
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(
    _service: &service::Service<service::Started>,
    _mapping_path: &str,
    _patch_path: Option<&str>,
) {
    tokio::signal::ctrl_c().await.unwrap();
}

pub fn get_version() -> String {
    format!(
        "ehub_router: {} (built at {})",
        built_info::PKG_VERSION,
        built_info::BUILT_TIME_UTC
    )
}

// Include the generated-file as a separate module
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
